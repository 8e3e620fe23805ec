//! PDF text layer extraction via Google PDFium.
//!
//! Only the native text layer is read (no rendering, no OCR). Each call binds
//! a fresh `Pdfium` instance because the upstream type is `!Send`; the OS
//! caches the library load, so repeat binds are cheap.

use pdfium_render::prelude::*;
use tracing::debug;

use super::types::{decode_utf8, DocumentTextExtractor};
use super::FormatError;

/// Extracts the text layer of PDF documents.
pub struct PdfiumTextExtractor;

impl PdfiumTextExtractor {
    /// Create an extractor, verifying the PDFium library is loadable.
    ///
    /// Discovery order:
    /// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path to library file)
    /// 2. Alongside the running executable (or its `pdfium/` subdirectory)
    /// 3. System library search paths
    pub fn new() -> Result<Self, FormatError> {
        load_pdfium().map_err(|cause| FormatError::Pdf {
            artifact: "<pdfium>".into(),
            cause,
        })?;
        Ok(Self)
    }
}

fn load_pdfium() -> Result<Pdfium, String> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|e| format!("Failed to load PDFium from {path}: {e}"))?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            for dir in [exe_dir.to_path_buf(), exe_dir.join("pdfium")] {
                let lib_path =
                    Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
                if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                    debug!(dir = %dir.display(), "Loaded PDFium next to executable");
                    return Ok(Pdfium::new(bindings));
                }
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        format!("PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}")
    })?;
    Ok(Pdfium::new(bindings))
}

/// Turn a PDF load failure message into a per-artifact error.
fn load_failure(artifact: &str, message: &str) -> FormatError {
    let lower = message.to_lowercase();
    let cause = if lower.contains("password") || lower.contains("encrypt") {
        "PDF is password-protected; decrypt it first".to_string()
    } else {
        format!("Failed to load PDF: {message}")
    };
    FormatError::Pdf {
        artifact: artifact.to_string(),
        cause,
    }
}

impl DocumentTextExtractor for PdfiumTextExtractor {
    fn extract_text(&self, artifact: &str, bytes: &[u8]) -> Result<String, FormatError> {
        let pdfium = load_pdfium().map_err(|cause| FormatError::Pdf {
            artifact: artifact.to_string(),
            cause,
        })?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| load_failure(artifact, &e.to_string()))?;

        let mut text = String::new();
        let mut pages = 0usize;
        for page in document.pages().iter() {
            pages += 1;
            if let Ok(page_text) = page.text() {
                text.push_str(&page_text.all());
                text.push('\n');
            }
        }

        debug!(artifact, pages, chars = text.len(), "PDF text layer extracted");
        Ok(text)
    }
}

/// Documents that are already UTF-8 text.
pub struct Utf8TextExtractor;

impl DocumentTextExtractor for Utf8TextExtractor {
    fn extract_text(&self, artifact: &str, bytes: &[u8]) -> Result<String, FormatError> {
        decode_utf8(artifact, bytes).map(str::to_string)
    }
}
