// src/decode/mod.rs

mod docx;
mod pdf;
mod sheet;

use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),

    #[error("upload too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("failed to extract text: document has no text layer (scanned or image-only)")]
    NoTextLayer,

    #[error("failed to extract text: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to extract text: {0}")]
    PdfText(String),

    #[error("failed to extract text: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("failed to extract text: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to extract text: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to extract text: {0}")]
    Io(#[from] std::io::Error),
}

/// Format family of an uploaded report, chosen from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    /// `.xlsx` / `.xls`
    Spreadsheet,
    /// `.docx`
    WordDocument,
    /// `.txt` / `.csv`
    PlainText,
}

impl DocumentFormat {
    pub fn from_file_name(name: &str) -> Result<Self, DecodeError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "xlsx" | "xls" => Ok(Self::Spreadsheet),
            "docx" => Ok(Self::WordDocument),
            "txt" | "csv" => Ok(Self::PlainText),
            "doc" => Err(DecodeError::Unsupported(
                "legacy .doc (save the report as .docx)".to_string(),
            )),
            "" => Err(DecodeError::Unsupported(format!("'{name}' has no extension"))),
            other => Err(DecodeError::Unsupported(format!(".{other}"))),
        }
    }
}

/// Turn raw file bytes into one flat text string.
pub fn decode(bytes: &[u8], format: DocumentFormat) -> Result<String, DecodeError> {
    let text = match format {
        DocumentFormat::Pdf => pdf::extract_text(bytes)?,
        DocumentFormat::Spreadsheet => sheet::extract_text(bytes)?,
        DocumentFormat::WordDocument => docx::extract_text(bytes)?,
        DocumentFormat::PlainText => {
            let text = String::from_utf8_lossy(bytes);
            text.strip_prefix('\u{feff}').unwrap_or(&*text).to_string()
        }
    };
    info!(format = ?format, chars = text.len(), "Decoded document text");
    Ok(text)
}
