//! HSE indicator reporting: report text extraction, per-month datasets with
//! merge-on-save storage, and monthly / cumulative totals with derived LTIF.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod dataset;
pub mod decode;
pub mod heuristics;
pub mod pipeline;
pub mod report;
pub mod store;
