use super::{RecordStore, StoreError, now_rfc3339, resolve};
use crate::catalog::Catalog;
use crate::dataset::{DatasetPatch, IndicatorDataset};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Flat-file backend: `<data_dir>/<project>_<month>.json`, one pretty-printed
/// dataset per file. Read-modify-write, so meant for a single writer.
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn file_path(&self, project_id: &str, month_id: &str) -> PathBuf {
        self.data_dir.join(format!("{project_id}_{month_id}.json"))
    }
}

impl RecordStore for JsonFileStore {
    fn load(
        &self,
        catalog: &Catalog,
        project_id: &str,
        month_id: &str,
    ) -> Result<IndicatorDataset, StoreError> {
        let project = resolve(catalog, project_id, month_id)?;
        let path = self.file_path(project_id, month_id);
        if !path.exists() {
            return Ok(IndicatorDataset::empty(project, month_id, catalog));
        }

        let content = fs::read_to_string(&path)?;
        match serde_json::from_str::<IndicatorDataset>(&content) {
            Ok(mut dataset) => {
                dataset.project_id = project.id.clone();
                dataset.month_id = month_id.to_string();
                dataset.conform(project, catalog);
                Ok(dataset)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Unreadable dataset file, starting empty"
                );
                Ok(IndicatorDataset::empty(project, month_id, catalog))
            }
        }
    }

    fn save(
        &self,
        catalog: &Catalog,
        project_id: &str,
        month_id: &str,
        patch: &DatasetPatch,
    ) -> Result<IndicatorDataset, StoreError> {
        let project = resolve(catalog, project_id, month_id)?;
        let mut dataset = self.load(catalog, project_id, month_id)?;
        let written = dataset.merge(patch, project, catalog);
        dataset.last_updated = Some(now_rfc3339()?);

        fs::create_dir_all(&self.data_dir)?;
        let path = self.file_path(project_id, month_id);
        fs::write(&path, serde_json::to_string_pretty(&dataset)?)?;

        info!(path = %path.display(), values = written, "Dataset saved");
        Ok(dataset)
    }
}
