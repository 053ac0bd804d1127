// src/decode/pdf.rs

use super::DecodeError;
use lopdf::Document;
use tracing::{info, warn};

/// Minimum number of non-whitespace characters we expect from a
/// "real" text PDF. Below this threshold we treat it as scanned.
const MIN_TEXT_CHARS: usize = 30;

/// Share of image-only pages above which the whole PDF counts as scanned.
const SCANNED_PAGE_RATIO: f64 = 0.8;

/// Text layer of a PDF report. Scanned documents are rejected, OCR is not
/// attempted.
pub(super) fn extract_text(pdf_bytes: &[u8]) -> Result<String, DecodeError> {
    // --- Phase 1: structural check with lopdf ---
    let doc = Document::load_mem(pdf_bytes)?;

    if looks_like_scanned(&doc) {
        info!("PDF structural check: likely scanned / image-only");
        return Err(DecodeError::NoTextLayer);
    }

    // --- Phase 2: full text extraction ---
    let text = pdf_extract::extract_text_from_mem(pdf_bytes).map_err(|e| {
        warn!(error = %e, "pdf-extract failed");
        DecodeError::PdfText(e.to_string())
    })?;

    let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
    if meaningful < MIN_TEXT_CHARS {
        info!(chars = meaningful, "Extracted text too short, treating as scanned");
        return Err(DecodeError::NoTextLayer);
    }

    info!(chars = meaningful, "Text extracted successfully");
    Ok(text)
}

/// Inspect each page's `Resources` dictionary. A page with XObject images
/// but no Font resources is almost certainly a scanned page.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false;
    }

    let resource = |page_dict: &lopdf::Dictionary, key: &[u8]| -> bool {
        page_dict
            .get(b"Resources")
            .ok()
            .and_then(|r| doc.dereference(r).ok())
            .and_then(|(_, resolved)| resolved.as_dict().ok())
            .and_then(|res| res.get(key).ok())
            .and_then(|x| doc.dereference(x).ok())
            .and_then(|(_, resolved)| resolved.as_dict().ok())
            .is_some_and(|d| !d.is_empty())
    };

    let image_only_pages = pages
        .values()
        .filter_map(|id| doc.get_object(*id).ok())
        .filter_map(|obj| obj.as_dict().ok())
        .filter(|page| resource(page, b"XObject") && !resource(page, b"Font"))
        .count();

    let total = pages.len();
    let ratio = image_only_pages as f64 / total as f64;
    info!(
        total_pages = total,
        image_only = image_only_pages,
        ratio = format!("{ratio:.2}"),
        "Scanned-page analysis"
    );

    ratio >= SCANNED_PAGE_RATIO
}
