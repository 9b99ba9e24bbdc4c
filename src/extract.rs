//! Text extraction from source files.
//!
//! PDF extraction goes through `pdf-extract`; plain text and markdown are
//! read as UTF-8. Anything else is rejected up front so the pipeline never
//! embeds binary garbage.

use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum ExtractError {
    UnsupportedFileType(String),
    Pdf(String),
    Io(std::io::Error),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::UnsupportedFileType(ext) => {
                write!(f, "Unsupported file type: .{} (expected pdf, txt, or md)", ext)
            }
            ExtractError::Pdf(msg) => write!(f, "PDF extraction failed: {}", msg),
            ExtractError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        ExtractError::Io(e)
    }
}

/// Extract the raw text of a source file by extension.
pub fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => pdf_extract::extract_text(path).map_err(|e| ExtractError::Pdf(e.to_string())),
        "txt" | "md" => Ok(std::fs::read_to_string(path)?),
        _ => Err(ExtractError::UnsupportedFileType(ext)),
    }
}
