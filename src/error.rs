//! Error types for the crawl2text library.
//!
//! One typed error enum, two propagation regimes:
//!
//! * **Caller-fault errors** (bad config, unbuildable HTTP client, unwritable
//!   output file) are returned as `Err(IngestError)` from the public entry
//!   points — the run never started, there is nothing to degrade.
//!
//! * **Per-source and per-asset failures** (dead link, corrupt image, OCR
//!   failure, browser crash) never unwind past the enclosing source item.
//!   The pipeline renders them into error [`Chunk`](crate::Chunk)s inline in
//!   the output stream, the batch keeps going, and cleanup always runs.
//!
//! The `Display` text of every variant is written to be shown to end users
//! verbatim, because that is exactly what the error chunks do.

use std::path::PathBuf;
use thiserror::Error;

/// All errors raised by the crawl2text pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A pdf/image source path points at nothing.
    #[error("file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// A source path is neither an existing file nor an HTTP/HTTPS URL.
    #[error("invalid source '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidSource { input: String },

    /// URL failed to parse.
    #[error("invalid URL '{url}': {detail}")]
    InvalidUrl { url: String, detail: String },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// Network-level failure issuing a GET (DNS, connect, timeout, TLS).
    #[error("failed to fetch '{url}': {reason}")]
    FetchFailed { url: String, reason: String },

    /// The server answered, but not with a 2xx.
    #[error("HTTP {status} fetching '{url}'")]
    HttpStatus { url: String, status: u16 },

    /// Asset transfer started but did not complete.
    #[error("failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── Browser errors ────────────────────────────────────────────────────
    /// The headless browser process could not be started at all.
    #[error("failed to launch headless browser: {detail}\nIs a Chromium/Chrome binary installed and on PATH?")]
    BrowserLaunch { detail: String },

    /// Navigation or DOM capture failed inside a running browser.
    #[error("dynamic fetch of '{url}' failed: {detail}")]
    BrowserNavigation { url: String, detail: String },

    /// The rendered fetch exceeded its wall-clock bound.
    #[error("dynamic fetch of '{url}' timed out after {secs}s\nIncrease render_timeout_secs if the page is just slow.")]
    RenderTimeout { url: String, secs: u64 },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "failed to bind to pdfium library: {0}\n\
Install pdfium or place the shared library next to the executable\n\
(libpdfium.so / libpdfium.dylib / pdfium.dll)."
    )]
    PdfEngine(String),

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt or unreadable: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Encrypted document; this pipeline takes no passwords.
    #[error("PDF '{path}' is password-protected and cannot be processed")]
    PasswordProtected { path: PathBuf },

    /// pdfium returned an error rasterising one page.
    #[error("rasterisation failed for page {page}: {detail}")]
    PageRenderFailed { page: usize, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR engine could not produce text for a file.
    #[error("OCR failed for '{path}': {detail}")]
    OcrFailed { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write inside the temporary workspace.
    #[error("workspace I/O error at '{path}': {source}")]
    WorkspaceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output text file.
    #[error("failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The shared HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (joined task panicked, channel glitch).
    #[error("internal error: {0}")]
    Internal(String),
}
