// src/store/mod.rs

mod json_file;
mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

use crate::catalog::{Catalog, Month, Project};
use crate::config::{StorageBackend, StorageSection};
use crate::dataset::{DatasetPatch, IndicatorDataset};
use std::fs;
use std::path::Path;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("project not found: {0}")]
    UnknownProject(String),

    #[error("month not found: {0}")]
    UnknownMonth(String),

    #[error("contract not found: {contract} (project {project})")]
    UnknownContract { project: String, contract: String },

    #[error("failed to save: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to save: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to save: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to save: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Persistence of one indicator dataset per (project, month).
pub trait RecordStore {
    /// The stored dataset, or an all-empty one when nothing was saved yet.
    fn load(
        &self,
        catalog: &Catalog,
        project_id: &str,
        month_id: &str,
    ) -> Result<IndicatorDataset, StoreError>;

    /// Merge `patch` into the stored dataset and return the result. Values
    /// the patch does not supply are left untouched.
    fn save(
        &self,
        catalog: &Catalog,
        project_id: &str,
        month_id: &str,
        patch: &DatasetPatch,
    ) -> Result<IndicatorDataset, StoreError>;

    /// One dataset per month, in the order given.
    fn load_all(
        &self,
        catalog: &Catalog,
        project_id: &str,
        months: &[Month],
    ) -> Result<Vec<IndicatorDataset>, StoreError> {
        months
            .iter()
            .map(|m| self.load(catalog, project_id, &m.id))
            .collect()
    }
}

/// Open the backend selected in the `[storage]` config section.
pub fn open(storage: &StorageSection) -> Result<Box<dyn RecordStore>, StoreError> {
    match storage.backend {
        StorageBackend::Sqlite => {
            info!(db_path = %storage.db_path, "Using SQLite record store");
            if let Some(parent) = Path::new(&storage.db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            Ok(Box::new(SqliteStore::new(&storage.db_path)?))
        }
        StorageBackend::Json => {
            info!(data_dir = %storage.data_dir, "Using JSON file record store");
            Ok(Box::new(JsonFileStore::new(&storage.data_dir)))
        }
    }
}

/// Look up the project and check the month exists.
fn resolve<'a>(
    catalog: &'a Catalog,
    project_id: &str,
    month_id: &str,
) -> Result<&'a Project, StoreError> {
    let project = catalog
        .project(project_id)
        .ok_or_else(|| StoreError::UnknownProject(project_id.to_string()))?;
    if catalog.month(month_id).is_none() {
        return Err(StoreError::UnknownMonth(month_id.to_string()));
    }
    Ok(project)
}

fn now_rfc3339() -> Result<String, StoreError> {
    Ok(OffsetDateTime::now_utc().format(&Rfc3339)?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::catalog::{Catalog, Contract, Month, Project};

    pub fn catalog() -> Catalog {
        let project = Project {
            id: "chenda".into(),
            name: "Chenda".into(),
            short_name: "CHD".into(),
            description: "Chenda Project".into(),
            color: "#117a65".into(),
            contracts: vec![
                Contract {
                    id: "A".into(),
                    label: "A (MHB)".into(),
                },
                Contract {
                    id: "B".into(),
                    label: "B (HHA)".into(),
                },
            ],
        };
        let months = vec![
            Month {
                id: "Mar-26".into(),
                label: "March 2026".into(),
            },
            Month {
                id: "Apr-26".into(),
                label: "April 2026".into(),
            },
        ];
        Catalog::new(vec![project], months)
    }
}
