//! OCR engine seam and image text extraction.
//!
//! ## Why a trait?
//!
//! OCR is the one stage with a heavyweight external dependency (the
//! `tesseract` binary). Hiding it behind [`OcrEngine`] lets tests inject a
//! deterministic fake, lets callers plug in a hosted OCR service, and keeps
//! the rest of the pipeline ignorant of how glyphs become strings.
//!
//! ## Why synchronous?
//!
//! The default engine shells out to `tesseract` and blocks until it exits.
//! A sync trait called through `spawn_blocking` keeps the seam honest about
//! that: implementations do their work on the blocking pool, and the async
//! pipeline never stalls a worker thread.

use crate::error::IngestError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Recognises text in image files. Implementations must be cheap to share
/// (`Arc<dyn OcrEngine>`) and safe to call from blocking-pool threads.
pub trait OcrEngine: Send + Sync {
    /// Engine name for logs and diagnostics.
    fn name(&self) -> &str;

    /// Recognise text in the image file at `path`, returning it verbatim.
    /// Blocking; always invoked via `spawn_blocking`.
    fn recognize(&self, path: &Path) -> Result<String, IngestError>;
}

/// Default engine: drives the system `tesseract` binary.
pub struct TesseractOcr {
    args: rusty_tesseract::Args,
}

impl TesseractOcr {
    /// English, 300 DPI input hint.
    pub fn new() -> Self {
        Self::with_options("eng", 300)
    }

    /// Custom language code (tesseract's `-l`, e.g. `"deu"`, `"eng+fra"`)
    /// and input DPI hint.
    pub fn with_options(language: impl Into<String>, dpi: u32) -> Self {
        let mut args = rusty_tesseract::Args::default();
        args.lang = language.into();
        args.dpi = Some(dpi as i32);
        Self { args }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, path: &Path) -> Result<String, IngestError> {
        let image =
            rusty_tesseract::Image::from_path(path).map_err(|e| IngestError::OcrFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        let text = rusty_tesseract::image_to_string(&image, &self.args).map_err(|e| {
            IngestError::OcrFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }
        })?;
        debug!(path = %path.display(), chars = text.len(), "OCR complete");
        Ok(text)
    }
}

/// Run OCR over one image file on the blocking pool.
///
/// Returns the recognised text verbatim — no trimming, no cleanup. Callers
/// that can tolerate failure convert the error into an error chunk.
pub async fn extract_image_text(
    path: &Path,
    engine: &Arc<dyn OcrEngine>,
) -> Result<String, IngestError> {
    let engine = Arc::clone(engine);
    let path: PathBuf = path.to_path_buf();

    let result = tokio::task::spawn_blocking(move || engine.recognize(&path))
        .await
        .map_err(|e| IngestError::Internal(format!("OCR task panicked: {e}")))?;

    result
}
