// src/aggregate.rs

use crate::catalog::{Catalog, Contract, IndicatorKind, Rate};
use crate::dataset::{Field, IndicatorDataset, PlannedActual};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// What a totals view covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Scope {
    Month {
        month_id: String,
    },
    Cumulative { months: Vec<String> },
}

/// Per-contract cells of one indicator row plus its Total column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowValues {
    Single {
        cells: Vec<Option<f64>>,
        total: Option<f64>,
    },
    PlannedActual {
        cells: Vec<PlannedActual>,
        total: PlannedActual,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsRow {
    pub indicator: String,
    pub derived: bool,
    #[serde(flatten)]
    pub values: RowValues,
}

/// Indicator x contract table with a Total column, in catalogue and contract
/// order. `cells` of every row line up with `contracts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsView {
    pub project_id: String,
    #[serde(flatten)]
    pub scope: Scope,
    pub contracts: Vec<Contract>,
    pub rows: Vec<TotalsRow>,
}

impl TotalsView {
    pub fn row(&self, indicator: &str) -> Option<&TotalsRow> {
        self.rows.iter().find(|r| r.indicator == indicator)
    }

    fn contract_index(&self, contract: &str) -> Option<usize> {
        self.contracts.iter().position(|c| c.id == contract)
    }

    pub fn single_cell(&self, indicator: &str, contract: &str) -> Option<f64> {
        let idx = self.contract_index(contract)?;
        match &self.row(indicator)?.values {
            RowValues::Single { cells, .. } => cells.get(idx).copied().flatten(),
            RowValues::PlannedActual { .. } => None,
        }
    }

    pub fn single_total(&self, indicator: &str) -> Option<f64> {
        match &self.row(indicator)?.values {
            RowValues::Single { total, .. } => *total,
            RowValues::PlannedActual { .. } => None,
        }
    }

    pub fn pair_cell(&self, indicator: &str, contract: &str) -> PlannedActual {
        let idx = self.contract_index(contract);
        match (self.row(indicator).map(|r| &r.values), idx) {
            (Some(RowValues::PlannedActual { cells, .. }), Some(i)) => {
                cells.get(i).copied().unwrap_or_default()
            }
            _ => PlannedActual::default(),
        }
    }

    pub fn pair_total(&self, indicator: &str) -> PlannedActual {
        match self.row(indicator).map(|r| &r.values) {
            Some(RowValues::PlannedActual { total, .. }) => *total,
            _ => PlannedActual::default(),
        }
    }
}

/// Present values keyed by (indicator, contract, field).
struct Grid {
    values: HashMap<(String, String, Field), f64>,
}

impl Grid {
    fn summed<'a>(datasets: impl IntoIterator<Item = &'a IndicatorDataset>) -> Self {
        let mut values = HashMap::new();
        for ds in datasets {
            for cell in ds.cells() {
                *values
                    .entry((cell.indicator, cell.contract, cell.field))
                    .or_insert(0.0) += cell.value;
            }
        }
        Self { values }
    }

    fn get(&self, indicator: &str, contract: &str, field: Field) -> Option<f64> {
        self.values
            .get(&(indicator.to_string(), contract.to_string(), field))
            .copied()
    }
}

/// Totals for one month.
pub fn monthly_total(
    dataset: &IndicatorDataset,
    contracts: &[Contract],
    catalog: &Catalog,
) -> TotalsView {
    let grid = Grid::summed([dataset]);
    build_view(
        &grid,
        &dataset.project_id,
        Scope::Month {
            month_id: dataset.month_id.clone(),
        },
        contracts,
        catalog,
    )
}

/// Totals summed over every given month. A contract cell is absent only when
/// no month had a value for it; derived rates are recomputed from the summed
/// inputs.
pub fn cumulative(
    project_id: &str,
    datasets: &[IndicatorDataset],
    contracts: &[Contract],
    catalog: &Catalog,
) -> TotalsView {
    debug!(project = %project_id, months = datasets.len(), "Computing cumulative totals");
    let grid = Grid::summed(datasets);
    build_view(
        &grid,
        project_id,
        Scope::Cumulative {
            months: datasets.iter().map(|d| d.month_id.clone()).collect(),
        },
        contracts,
        catalog,
    )
}

fn build_view(
    grid: &Grid,
    project_id: &str,
    scope: Scope,
    contracts: &[Contract],
    catalog: &Catalog,
) -> TotalsView {
    let rows = catalog
        .indicators
        .iter()
        .map(|ind| {
            let values = match (ind.kind, &ind.derived) {
                (IndicatorKind::Single, Some(rate)) => rate_row(grid, rate, contracts),
                (IndicatorKind::Single, None) => single_row(grid, &ind.name, contracts),
                (IndicatorKind::PlannedActual, _) => pair_row(grid, &ind.name, contracts),
            };
            TotalsRow {
                indicator: ind.name.clone(),
                derived: ind.is_derived(),
                values,
            }
        })
        .collect();

    TotalsView {
        project_id: project_id.to_string(),
        scope,
        contracts: contracts.to_vec(),
        rows,
    }
}

fn single_row(grid: &Grid, indicator: &str, contracts: &[Contract]) -> RowValues {
    let cells: Vec<Option<f64>> = contracts
        .iter()
        .map(|c| grid.get(indicator, &c.id, Field::Value))
        .collect();
    RowValues::Single {
        total: sum_present(cells.iter().copied()),
        cells,
    }
}

fn pair_row(grid: &Grid, indicator: &str, contracts: &[Contract]) -> RowValues {
    let cells: Vec<PlannedActual> = contracts
        .iter()
        .map(|c| PlannedActual {
            planned: grid.get(indicator, &c.id, Field::Planned),
            actual: grid.get(indicator, &c.id, Field::Actual),
        })
        .collect();
    let total = PlannedActual {
        planned: sum_present(cells.iter().map(|p| p.planned)),
        actual: sum_present(cells.iter().map(|p| p.actual)),
    };
    RowValues::PlannedActual { cells, total }
}

/// Per contract: `numerator * scale / denominator`. Total: the same ratio
/// over the contract sums, never a sum or mean of the per-contract ratios.
fn rate_row(grid: &Grid, rate: &Rate, contracts: &[Contract]) -> RowValues {
    let mut num_total = 0.0;
    let mut den_total = 0.0;
    let cells = contracts
        .iter()
        .map(|c| {
            let num = grid.get(&rate.numerator, &c.id, Field::Value).unwrap_or(0.0);
            let den = grid.get(&rate.denominator, &c.id, Field::Value).unwrap_or(0.0);
            num_total += num;
            den_total += den;
            ratio(num, den, rate.scale)
        })
        .collect();
    RowValues::Single {
        cells,
        total: ratio(num_total, den_total, rate.scale),
    }
}

fn ratio(num: f64, den: f64, scale: f64) -> Option<f64> {
    (den > 0.0).then(|| num * scale / den)
}

/// Sum of the present values, or absent when none is present.
fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}
