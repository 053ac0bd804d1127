use crate::catalog::{Catalog, Month, Project};
use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;
use tracing::{info, warn};

/// Default configuration shipped with the crate.
const BUILTIN_CONFIG: &str = include_str!("../config/hse.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub upload: UploadSection,
    #[serde(default)]
    pub months: Vec<Month>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            db_path: default_db_path(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_db_path() -> String {
    "data/hse.db".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UploadSection {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_max_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_preview_chars() -> usize {
    1000
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in config.
    pub fn load_or_builtin(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            info!(path = %path.display(), "Loading config");
            Self::load(path)
        } else {
            warn!(path = %path.display(), "Config file not found, using built-in defaults");
            Self::builtin()
        }
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(BUILTIN_CONFIG)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.months.is_empty() {
            return Err(ConfigError::Invalid("no months configured".into()));
        }
        for project in &self.projects {
            if project.contracts.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "project '{}' has no contracts",
                    project.id
                )));
            }
            for (i, c) in project.contracts.iter().enumerate() {
                if project.contracts[..i].iter().any(|o| o.id == c.id) {
                    return Err(ConfigError::Invalid(format!(
                        "project '{}' lists contract '{}' twice",
                        project.id, c.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.projects.clone(), self.months.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_has_three_projects_and_ten_months() {
        let cfg = Config::builtin().unwrap();
        assert_eq!(cfg.projects.len(), 3);
        assert_eq!(cfg.months.len(), 10);
        assert_eq!(cfg.months[0].id, "Mar-26");
        assert_eq!(cfg.storage.backend, StorageBackend::Sqlite);
        assert_eq!(cfg.upload.max_bytes, 20 * 1024 * 1024);

        let sirung = cfg.catalog();
        let sirung = sirung.project("sirung").unwrap();
        assert_eq!(sirung.contracts[0].id, "P11");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg = Config::parse(
            r#"
            [[months]]
            id = "Jan-27"
            label = "January 2027"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.storage.db_path, "data/hse.db");
        assert_eq!(cfg.upload.preview_chars, 1000);
        assert!(cfg.projects.is_empty());
    }

    #[test]
    fn json_backend_is_selectable() {
        let cfg = Config::parse(
            r#"
            [storage]
            backend = "json"
            data_dir = "/tmp/hse"

            [[months]]
            id = "Mar-26"
            label = "March 2026"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.storage.backend, StorageBackend::Json);
        assert_eq!(cfg.storage.data_dir, "/tmp/hse");
    }

    #[test]
    fn duplicate_contract_is_rejected() {
        let err = Config::parse(
            r##"
            [[months]]
            id = "Mar-26"
            label = "March 2026"

            [[projects]]
            id = "x"
            name = "X"
            short_name = "X"
            contracts = [{ id = "P2", label = "a" }, { id = "P2", label = "b" }]
            "##,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
