// src/heuristics/mod.rs

mod keyword;

use crate::catalog::{Catalog, IndicatorKind};
use crate::dataset::{DatasetPatch, PlannedActual};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Indicator values found in one uploaded report.
///
/// An indicator missing from both maps was not detected; that is different
/// from a detected value of `0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default, alias = "table1")]
    pub single: BTreeMap<String, f64>,
    #[serde(default, alias = "table2")]
    pub planned_actual: BTreeMap<String, PlannedActual>,
}

impl ExtractionResult {
    pub fn single(&self, indicator: &str) -> Option<f64> {
        self.single.get(indicator).copied()
    }

    pub fn pair(&self, indicator: &str) -> Option<PlannedActual> {
        self.planned_actual.get(indicator).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.planned_actual.is_empty()
    }

    /// How many indicators were detected, out of all catalogued ones.
    pub fn coverage(&self, catalog: &Catalog) -> (usize, usize) {
        (
            self.single.len() + self.planned_actual.len(),
            catalog.indicators.len(),
        )
    }

    /// Save request that files every detected value under `contract`.
    /// Derived indicators are left out; they are recomputed, never stored.
    pub fn to_patch(&self, contract: &str, catalog: &Catalog) -> DatasetPatch {
        let mut patch = DatasetPatch::default();
        for (indicator, value) in &self.single {
            if catalog.indicator(indicator).is_some_and(|i| i.is_derived()) {
                continue;
            }
            patch.set_single(indicator, contract, *value);
        }
        for (indicator, pair) in &self.planned_actual {
            patch.set_pair(indicator, contract, *pair);
        }
        patch
    }
}

/// Locate indicator values in decoded report text.
///
/// Each indicator is searched independently. Its keywords are tried in
/// catalogue order and, per keyword, lines from the top of the document;
/// the first line containing the keyword that carries a usable number wins.
pub fn extract_indicators(text: &str, catalog: &Catalog) -> ExtractionResult {
    let lines = keyword::split_lines(text);
    let mut result = ExtractionResult::default();

    for ind in &catalog.indicators {
        match ind.kind {
            IndicatorKind::Single => {
                if let Some(v) = keyword::find_single(&lines, &ind.keywords) {
                    debug!(indicator = %ind.name, value = v, "Indicator detected");
                    result.single.insert(ind.name.clone(), v);
                }
            }
            IndicatorKind::PlannedActual => {
                if let Some(pair) = keyword::find_planned_actual(&lines, &ind.keywords) {
                    debug!(
                        indicator = %ind.name,
                        planned = ?pair.planned,
                        actual = ?pair.actual,
                        "Indicator detected"
                    );
                    result.planned_actual.insert(ind.name.clone(), pair);
                }
            }
        }
    }

    result
}
