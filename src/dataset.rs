// src/dataset.rs

use crate::catalog::{Catalog, IndicatorKind, Project};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Planned target and actual figure for one contract. Either side may be
/// missing independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannedActual {
    pub planned: Option<f64>,
    pub actual: Option<f64>,
}

impl PlannedActual {
    pub fn is_empty(&self) -> bool {
        self.planned.is_none() && self.actual.is_none()
    }
}

/// Per-contract values of one indicator, shaped by its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "contracts", rename_all = "snake_case")]
pub enum IndicatorValues {
    Single(BTreeMap<String, Option<f64>>),
    PlannedActual(BTreeMap<String, PlannedActual>),
}

/// Which stored number of a cell is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Value,
    Planned,
    Actual,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Value => "value",
            Field::Planned => "planned",
            Field::Actual => "actual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "value" => Some(Field::Value),
            "planned" => Some(Field::Planned),
            "actual" => Some(Field::Actual),
            _ => None,
        }
    }
}

/// One present value addressed by (indicator, contract, field).
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub indicator: String,
    pub contract: String,
    pub field: Field,
    pub value: f64,
}

/// All indicator values of one project for one month.
///
/// Every stored indicator has an entry for every contract of the project;
/// only the values themselves are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDataset {
    pub project_id: String,
    pub month_id: String,
    pub indicators: BTreeMap<String, IndicatorValues>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl IndicatorDataset {
    pub fn empty(project: &Project, month_id: &str, catalog: &Catalog) -> Self {
        let mut indicators = BTreeMap::new();
        for ind in catalog.stored_indicators() {
            indicators.insert(ind.name.clone(), empty_values(ind.kind, project));
        }
        Self {
            project_id: project.id.clone(),
            month_id: month_id.to_string(),
            indicators,
            last_updated: None,
        }
    }

    /// Restore the full indicator x contract grid after deserializing a
    /// record written under a different catalog. Unknown entries are dropped.
    pub fn conform(&mut self, project: &Project, catalog: &Catalog) {
        let mut fresh = Self::empty(project, &self.month_id, catalog);
        for cell in self.cells() {
            fresh.apply(&cell);
        }
        self.indicators = fresh.indicators;
    }

    pub fn single(&self, indicator: &str, contract: &str) -> Option<f64> {
        match self.indicators.get(indicator)? {
            IndicatorValues::Single(m) => m.get(contract).copied().flatten(),
            IndicatorValues::PlannedActual(_) => None,
        }
    }

    pub fn pair(&self, indicator: &str, contract: &str) -> PlannedActual {
        match self.indicators.get(indicator) {
            Some(IndicatorValues::PlannedActual(m)) => m.get(contract).copied().unwrap_or_default(),
            _ => PlannedActual::default(),
        }
    }

    /// Write one value. Returns false when the cell is not part of the grid.
    pub fn apply(&mut self, cell: &Cell) -> bool {
        let Some(values) = self.indicators.get_mut(&cell.indicator) else {
            return false;
        };
        match (values, cell.field) {
            (IndicatorValues::Single(m), Field::Value) => match m.get_mut(&cell.contract) {
                Some(slot) => {
                    *slot = Some(cell.value);
                    true
                }
                None => false,
            },
            (IndicatorValues::PlannedActual(m), field @ (Field::Planned | Field::Actual)) => {
                match m.get_mut(&cell.contract) {
                    Some(pair) if field == Field::Planned => {
                        pair.planned = Some(cell.value);
                        true
                    }
                    Some(pair) => {
                        pair.actual = Some(cell.value);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    /// Every present value in the dataset.
    pub fn cells(&self) -> Vec<Cell> {
        let mut out = Vec::new();
        for (indicator, values) in &self.indicators {
            match values {
                IndicatorValues::Single(m) => {
                    for (contract, v) in m {
                        if let Some(v) = v {
                            out.push(cell(indicator, contract, Field::Value, *v));
                        }
                    }
                }
                IndicatorValues::PlannedActual(m) => {
                    for (contract, pair) in m {
                        if let Some(p) = pair.planned {
                            out.push(cell(indicator, contract, Field::Planned, p));
                        }
                        if let Some(a) = pair.actual {
                            out.push(cell(indicator, contract, Field::Actual, a));
                        }
                    }
                }
            }
        }
        out
    }

    /// Merge a save request. Only supplied values overwrite; everything the
    /// patch leaves out or blanks stays as it was. Returns the number of
    /// values written.
    pub fn merge(&mut self, patch: &DatasetPatch, project: &Project, catalog: &Catalog) -> usize {
        patch
            .cells(project, catalog)
            .iter()
            .filter(|c| self.apply(c))
            .count()
    }
}

fn empty_values(kind: IndicatorKind, project: &Project) -> IndicatorValues {
    match kind {
        IndicatorKind::Single => IndicatorValues::Single(
            project
                .contracts
                .iter()
                .map(|c| (c.id.clone(), None))
                .collect(),
        ),
        IndicatorKind::PlannedActual => IndicatorValues::PlannedActual(
            project
                .contracts
                .iter()
                .map(|c| (c.id.clone(), PlannedActual::default()))
                .collect(),
        ),
    }
}

fn cell(indicator: &str, contract: &str, field: Field, value: f64) -> Cell {
    Cell {
        indicator: indicator.to_string(),
        contract: contract.to_string(),
        field,
        value,
    }
}

/// An incoming value in a save request. Numbers and numeric strings are
/// supplied values; null, blank and non-numeric strings mean "not supplied".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PatchValue(pub Option<f64>);

impl From<f64> for PatchValue {
    fn from(v: f64) -> Self {
        PatchValue(Some(v))
    }
}

impl From<Option<f64>> for PatchValue {
    fn from(v: Option<f64>) -> Self {
        PatchValue(v)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for PatchValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = match Option::<RawValue>::deserialize(deserializer)? {
            Some(RawValue::Number(n)) => Some(n),
            Some(RawValue::Text(s)) => s.trim().replace(',', "").parse::<f64>().ok(),
            None => None,
        };
        Ok(PatchValue(value.filter(|v| v.is_finite())))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PairPatch {
    #[serde(default)]
    pub planned: PatchValue,
    #[serde(default)]
    pub actual: PatchValue,
}

/// A partial dataset submitted for saving.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetPatch {
    #[serde(default, alias = "table1")]
    pub single: BTreeMap<String, BTreeMap<String, PatchValue>>,
    #[serde(default, alias = "table2")]
    pub planned_actual: BTreeMap<String, BTreeMap<String, Option<PairPatch>>>,
}

impl DatasetPatch {
    pub fn set_single(&mut self, indicator: &str, contract: &str, value: impl Into<PatchValue>) {
        self.single
            .entry(indicator.to_string())
            .or_default()
            .insert(contract.to_string(), value.into());
    }

    pub fn set_pair(&mut self, indicator: &str, contract: &str, pair: PlannedActual) {
        self.planned_actual
            .entry(indicator.to_string())
            .or_default()
            .insert(
                contract.to_string(),
                Some(PairPatch {
                    planned: pair.planned.into(),
                    actual: pair.actual.into(),
                }),
            );
    }

    /// The supplied values that address a real cell of `project`. Unknown
    /// indicators, unknown contracts, class mismatches and derived indicators
    /// are dropped with a warning.
    pub fn cells(&self, project: &Project, catalog: &Catalog) -> Vec<Cell> {
        let mut out = Vec::new();

        for (indicator, contracts) in &self.single {
            if !accepts(catalog, indicator, IndicatorKind::Single) {
                continue;
            }
            for (contract, value) in contracts {
                if project.contract(contract).is_none() {
                    warn!(
                        project = %project.id,
                        contract = %contract,
                        "Unknown contract in save request"
                    );
                    continue;
                }
                if let Some(v) = value.0 {
                    out.push(cell(indicator, contract, Field::Value, v));
                }
            }
        }

        for (indicator, contracts) in &self.planned_actual {
            if !accepts(catalog, indicator, IndicatorKind::PlannedActual) {
                continue;
            }
            for (contract, pair) in contracts {
                let Some(pair) = pair else { continue };
                if project.contract(contract).is_none() {
                    warn!(
                        project = %project.id,
                        contract = %contract,
                        "Unknown contract in save request"
                    );
                    continue;
                }
                if let Some(p) = pair.planned.0 {
                    out.push(cell(indicator, contract, Field::Planned, p));
                }
                if let Some(a) = pair.actual.0 {
                    out.push(cell(indicator, contract, Field::Actual, a));
                }
            }
        }

        out
    }
}

fn accepts(catalog: &Catalog, indicator: &str, kind: IndicatorKind) -> bool {
    match catalog.indicator(indicator) {
        Some(ind) if ind.is_derived() => {
            warn!(indicator = %indicator, "Derived indicator is computed, not stored");
            false
        }
        Some(ind) if ind.kind == kind => true,
        Some(_) => {
            warn!(
                indicator = %indicator,
                kind = ?kind,
                "Indicator submitted under the wrong class"
            );
            false
        }
        None => {
            warn!(indicator = %indicator, "Unknown indicator in save request");
            false
        }
    }
}
