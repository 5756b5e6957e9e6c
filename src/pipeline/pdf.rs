//! PDF text extraction: rasterize every page, then OCR each rendering.
//!
//! Going through raster frames instead of the PDF text layer is deliberate.
//! Scanned and image-based PDFs have no text layer at all, and mixed
//! documents often have a broken one. Rendering each page at a fixed DPI and
//! OCR-ing the frame handles every variant with one code path, at the cost
//! of CPU time.
//!
//! All pdfium work runs on the blocking pool. Page frames are written to a
//! private scratch directory and each one is deleted as soon as its OCR pass
//! finishes, so peak disk usage stays at one frame per document.

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::pipeline::ocr::OcrEngine;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Extract text from every page of the PDF at `path`.
///
/// The whole document succeeds or fails as a unit: an error on any page
/// (render or OCR) aborts the extraction and returns that page's error.
/// Partial documents are worse than absent ones for a downstream corpus.
pub async fn extract_pdf_text(
    path: &Path,
    config: &IngestConfig,
    engine: &Arc<dyn OcrEngine>,
) -> Result<String, IngestError> {
    let path: PathBuf = path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let engine = Arc::clone(engine);

    let result = tokio::task::spawn_blocking(move || {
        extract_blocking(&path, dpi, max_pixels, engine.as_ref())
    })
    .await
    .map_err(|e| IngestError::Internal(format!("PDF task panicked: {e}")))?;

    result
}

fn extract_blocking(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    engine: &dyn OcrEngine,
) -> Result<String, IngestError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| map_open_error(pdf_path, &e))?;

    let scratch = tempfile::tempdir().map_err(|source| IngestError::WorkspaceIo {
        path: std::env::temp_dir(),
        source,
    })?;

    let pages = document.pages();
    let total = pages.len();
    debug!(path = %pdf_path.display(), pages = total, dpi, "rasterizing PDF");

    let frames =
        (0..total).map(|index| render_page_frame(&pages, index, dpi, max_pixels, scratch.path()));
    ocr_page_frames(frames, engine)
}

/// Render one page to a PNG frame in the scratch directory.
fn render_page_frame(
    pages: &PdfPages<'_>,
    index: u16,
    dpi: u32,
    max_pixels: u32,
    scratch: &Path,
) -> Result<PathBuf, IngestError> {
    let number = usize::from(index) + 1;
    let page = pages.get(index).map_err(|e| IngestError::PageRenderFailed {
        page: number,
        detail: format!("{e:?}"),
    })?;

    let width = target_width(page.width().value, dpi, max_pixels);
    let render_config = PdfRenderConfig::new()
        .set_target_width(width)
        .set_maximum_height(max_pixels as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| IngestError::PageRenderFailed {
            page: number,
            detail: format!("{e:?}"),
        })?;

    let frame = scratch.join(format!("page_{number}.png"));
    bitmap
        .as_image()
        .save(&frame)
        .map_err(|e| IngestError::PageRenderFailed {
            page: number,
            detail: e.to_string(),
        })?;
    Ok(frame)
}

/// OCR rendered frames in order into labeled page blocks.
///
/// The first render or OCR failure aborts the whole document; text
/// accumulated from earlier pages is dropped with the error rather than
/// returned as a partial extraction.
fn ocr_page_frames<I>(frames: I, engine: &dyn OcrEngine) -> Result<String, IngestError>
where
    I: IntoIterator<Item = Result<PathBuf, IngestError>>,
{
    let mut out = String::new();
    for (index, frame) in frames.into_iter().enumerate() {
        let frame = frame?;
        let text = engine.recognize(&frame)?;
        // One frame on disk at a time, no matter how long the document is.
        let _ = std::fs::remove_file(&frame);
        out.push_str(&page_block(index + 1, &text));
    }
    Ok(out.trim().to_string())
}

/// Locate a pdfium library: next to the executable first, then system-wide.
fn bind_pdfium() -> Result<Pdfium, IngestError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| IngestError::PdfEngine(format!("{e:?}")))
}

fn map_open_error(path: &Path, error: &PdfiumError) -> IngestError {
    let detail = format!("{error:?}");
    if detail.to_lowercase().contains("password") {
        IngestError::PasswordProtected {
            path: path.to_path_buf(),
        }
    } else {
        IngestError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

/// Pixel width for a page of `points` printer's points at `dpi`, capped so
/// a malformed page geometry cannot demand an absurd allocation.
fn target_width(points: f32, dpi: u32, max_pixels: u32) -> i32 {
    let px = (points / 72.0 * dpi as f32).round() as i64;
    px.clamp(1, i64::from(max_pixels)) as i32
}

fn page_block(number: usize, text: &str) -> String {
    format!("--- Page {number} ---\n{}\n\n", text.trim())
}
