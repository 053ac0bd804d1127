// src/catalog.rs

use serde::{Deserialize, Serialize};

pub const MANHOURS: &str = "Manhours";
pub const LTI: &str = "Loss Time Injury (LTI)";
pub const LTIF: &str = "Loss Time Injury Frequency (LTIF)";

/// Scale applied to LTI counts when deriving LTIF (injuries per million hours).
pub const LTIF_SCALE: f64 = 1_000_000.0;

/// How many values an indicator carries per contract per month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    /// One number per contract.
    Single,
    /// A planned target and an actual figure per contract.
    PlannedActual,
}

/// A `single` indicator computed from two other `single` indicators as
/// `numerator * scale / denominator`. Never stored, never summed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rate {
    pub numerator: String,
    pub denominator: String,
    pub scale: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Indicator {
    pub name: String,
    pub kind: IndicatorKind,
    /// Lower-cased synonyms, in match priority order.
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<Rate>,
}

impl Indicator {
    fn new(name: &str, kind: IndicatorKind, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            derived: None,
        }
    }

    fn derived(mut self, rate: Rate) -> Self {
        self.derived = Some(rate);
        self
    }

    pub fn is_derived(&self) -> bool {
        self.derived.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub contracts: Vec<Contract>,
}

fn default_color() -> String {
    "#1a5276".to_string()
}

impl Project {
    pub fn contract(&self, id: &str) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Month {
    pub id: String,
    pub label: String,
}

/// Everything the extractor, aggregator and stores need to know about the
/// reporting structure. Built once from configuration and passed by reference.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub projects: Vec<Project>,
    pub indicators: Vec<Indicator>,
    pub months: Vec<Month>,
}

impl Catalog {
    pub fn new(projects: Vec<Project>, months: Vec<Month>) -> Self {
        Self {
            projects,
            indicators: builtin_indicators(),
            months,
        }
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn month(&self, id: &str) -> Option<&Month> {
        self.months.iter().find(|m| m.id == id)
    }

    pub fn indicator(&self, name: &str) -> Option<&Indicator> {
        self.indicators.iter().find(|i| i.name == name)
    }

    /// Indicators of one class in declared order, derived ones included.
    pub fn indicators_of(&self, kind: IndicatorKind) -> impl Iterator<Item = &Indicator> {
        self.indicators.iter().filter(move |i| i.kind == kind)
    }

    /// Indicators that have cells in a stored dataset.
    pub fn stored_indicators(&self) -> impl Iterator<Item = &Indicator> {
        self.indicators.iter().filter(|i| !i.is_derived())
    }
}

/// The indicator registry: count-style indicators first, then planned/actual
/// ones. Keyword order inside each list is the extraction tie-break.
pub fn builtin_indicators() -> Vec<Indicator> {
    use IndicatorKind::{PlannedActual, Single};

    vec![
        Indicator::new(
            MANHOURS,
            Single,
            &[
                "manhours",
                "man-hours",
                "man hours",
                "working hours",
                "total hours",
                "exposure hours",
            ],
        ),
        Indicator::new("Fatality", Single, &["fatality", "fatalities", "fatal", "death"]),
        Indicator::new(
            LTI,
            Single,
            &[
                "loss time injury",
                "lti",
                "lost time injury",
                "lost time incident",
            ],
        ),
        Indicator::new(
            LTIF,
            Single,
            &[
                "ltif",
                "loss time injury frequency",
                "lost time injury frequency",
            ],
        )
        .derived(Rate {
            numerator: LTI.to_string(),
            denominator: MANHOURS.to_string(),
            scale: LTIF_SCALE,
        }),
        Indicator::new(
            "Major Oil Spills",
            Single,
            &["oil spill", "oil spills", "major spill"],
        ),
        Indicator::new("Major Fire", Single, &["major fire", "fire incident", "fire"]),
        Indicator::new(
            "Major Loss of Primary Containment (LOPC)",
            Single,
            &["lopc", "loss of primary containment", "loss of containment"],
        ),
        Indicator::new(
            "Medical Treatment / Restricted Work Case (MTC/RWC)",
            Single,
            &[
                "medical treatment case",
                "mtc",
                "restricted work case",
                "rwc",
                "mtc/rwc",
            ],
        ),
        Indicator::new(
            "First Aid Cases (FAC)",
            Single,
            &["first aid case", "first aid", "fac"],
        ),
        Indicator::new(
            "Property Damage",
            Single,
            &["property damage", "damage to property"],
        ),
        Indicator::new("Near Miss Case", Single, &["near miss", "near-miss", "nearmiss"]),
        Indicator::new(
            "Unsafe Act / Unsafe Condition",
            Single,
            &["unsafe act", "unsafe condition", "unsafe act/condition"],
        ),
        Indicator::new(
            "Stop Work",
            Single,
            &["stop work", "stopwork", "stop work authority", "swa"],
        ),
        Indicator::new(
            "Permanent Total / Partial Disability (PPD/PTD)",
            PlannedActual,
            &["ppd", "ptd", "permanent disability", "partial disability"],
        ),
        Indicator::new(
            "Management Walkabout",
            PlannedActual,
            &["management walkabout", "management visit", "walkabout"],
        ),
        Indicator::new(
            "HSSE Safe Work Campaign",
            PlannedActual,
            &["safe work campaign", "safety campaign", "hsse campaign"],
        ),
        Indicator::new(
            "HSSE Training Compliance",
            PlannedActual,
            &["training compliance", "hsse training"],
        ),
        Indicator::new(
            "HSSE Audit",
            PlannedActual,
            &["hsse audit", "safety audit", "audit"],
        ),
        Indicator::new(
            "Safety Training",
            PlannedActual,
            &["safety training", "training session", "safety course"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_indicator_has_lowercase_keywords() {
        for ind in builtin_indicators() {
            assert!(!ind.keywords.is_empty(), "{} has no keywords", ind.name);
            for kw in &ind.keywords {
                assert_eq!(kw, &kw.to_lowercase());
            }
        }
    }

    #[test]
    fn ltif_is_the_only_derived_indicator() {
        let derived: Vec<_> = builtin_indicators()
            .into_iter()
            .filter(|i| i.is_derived())
            .collect();
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].name, LTIF);
        let rate = derived[0].derived.as_ref().unwrap();
        assert_eq!(rate.numerator, LTI);
        assert_eq!(rate.denominator, MANHOURS);
    }

    #[test]
    fn registry_splits_thirteen_single_and_six_planned_actual() {
        let catalog = Catalog::new(Vec::new(), Vec::new());
        assert_eq!(catalog.indicators_of(IndicatorKind::Single).count(), 13);
        assert_eq!(catalog.indicators_of(IndicatorKind::PlannedActual).count(), 6);
        assert_eq!(catalog.stored_indicators().count(), 18);
    }
}
