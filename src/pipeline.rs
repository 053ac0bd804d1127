// src/pipeline.rs

use crate::catalog::Catalog;
use crate::config::UploadSection;
use crate::dataset::IndicatorDataset;
use crate::decode::{self, DecodeError, DocumentFormat};
use crate::heuristics::{self, ExtractionResult};
use crate::store::{RecordStore, StoreError};
use serde::Serialize;
use tracing::info;

/// What an upload produced, for a reviewer to confirm before saving.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub filename: String,
    pub contract_id: Option<String>,
    pub extracted: ExtractionResult,
    pub detected: usize,
    pub total: usize,
    pub raw_text_preview: String,
}

/// Size check, decode, extract. Decode failures reject the upload; an
/// upload in which nothing is detected is still a success.
pub fn process_upload(
    filename: &str,
    bytes: &[u8],
    contract_id: Option<&str>,
    catalog: &Catalog,
    limits: &UploadSection,
) -> Result<UploadOutcome, DecodeError> {
    let span = tracing::info_span!("upload", filename = %filename);
    let _guard = span.enter();

    if bytes.len() > limits.max_bytes {
        return Err(DecodeError::TooLarge {
            size: bytes.len(),
            limit: limits.max_bytes,
        });
    }

    let format = DocumentFormat::from_file_name(filename)?;
    let text = decode::decode(bytes, format)?;
    let extracted = heuristics::extract_indicators(&text, catalog);
    let (detected, total) = extracted.coverage(catalog);
    info!(detected, total, "Indicator extraction complete");

    Ok(UploadOutcome {
        filename: filename.to_string(),
        contract_id: contract_id.map(str::to_string),
        extracted,
        detected,
        total,
        raw_text_preview: text.chars().take(limits.preview_chars).collect(),
    })
}

/// File confirmed extraction values under one contract of a project month.
pub fn commit(
    store: &dyn RecordStore,
    catalog: &Catalog,
    project_id: &str,
    month_id: &str,
    contract_id: &str,
    extracted: &ExtractionResult,
) -> Result<IndicatorDataset, StoreError> {
    let project = catalog
        .project(project_id)
        .ok_or_else(|| StoreError::UnknownProject(project_id.to_string()))?;
    if project.contract(contract_id).is_none() {
        return Err(StoreError::UnknownContract {
            project: project_id.to_string(),
            contract: contract_id.to_string(),
        });
    }

    let patch = extracted.to_patch(contract_id, catalog);
    store.save(catalog, project_id, month_id, &patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MANHOURS;
    use crate::store::SqliteStore;
    use crate::store::test_support::catalog;

    fn limits() -> UploadSection {
        UploadSection {
            max_bytes: 1024,
            preview_chars: 12,
        }
    }

    #[test]
    fn text_upload_is_extracted_with_preview() {
        let body = "Manhours: 1,500\nFatality: 0\n";
        let out = process_upload("report.txt", body.as_bytes(), Some("A"), &catalog(), &limits())
            .unwrap();
        assert_eq!(out.extracted.single(MANHOURS), Some(1500.0));
        assert_eq!(out.detected, 2);
        assert_eq!(out.total, 19);
        assert_eq!(out.raw_text_preview, "Manhours: 1,");
        assert_eq!(out.contract_id.as_deref(), Some("A"));
    }

    #[test]
    fn oversized_upload_is_rejected_before_decoding() {
        let body = vec![b'x'; 2048];
        let err = process_upload("big.txt", &body, None, &catalog(), &limits()).unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge { size: 2048, limit: 1024 }));
    }

    #[test]
    fn unsupported_type_is_rejected() {
        let err = process_upload("scan.png", b"\x89PNG", None, &catalog(), &limits()).unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported(_)));
    }

    #[test]
    fn commit_saves_only_detected_values() {
        let catalog = catalog();
        let store = SqliteStore::new(":memory:").unwrap();
        let out = process_upload("r.csv", b"Fatality,2\n", Some("B"), &catalog, &limits()).unwrap();

        let ds = commit(&store, &catalog, "chenda", "Mar-26", "B", &out.extracted).unwrap();
        assert_eq!(ds.single("Fatality", "B"), Some(2.0));
        assert_eq!(ds.cells().len(), 1);

        assert!(matches!(
            commit(&store, &catalog, "chenda", "Mar-26", "Z", &out.extracted),
            Err(StoreError::UnknownContract { .. })
        ));
    }
}
