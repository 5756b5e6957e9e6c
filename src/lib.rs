//! # crawl2text
//!
//! Ingest heterogeneous content sources — web pages (static or
//! JavaScript-rendered), PDF documents, and raster images — into one plain
//! text corpus, delivered either as a single blob or as an incremental
//! stream of chunks.
//!
//! ## Why this crate?
//!
//! Feeding documents to a search index or a retrieval pipeline means
//! flattening whatever the documents are into text first. That job is messy
//! in a very specific way: pages link to more pages, pages embed PDFs and
//! scans, half the assets 404, and one corrupt file must not cost you the
//! other forty-nine. This crate does the flattening with bounded recursion,
//! at-most-once downloads, and per-source failure containment, so the output
//! is always a complete corpus with errors annotated inline rather than a
//! stack trace.
//!
//! ## Pipeline Overview
//!
//! ```text
//! sources (website | pdf | image)
//!  │
//!  ├─ 1. Fetch     HTTP GET, or headless Chromium for dynamic pages
//!  ├─ 2. Digest    heading-organized sections + FAQ extraction
//!  ├─ 3. Links     same-site navigation + PDF/image asset references
//!  ├─ 4. Recurse   up to 5 child links per page, depth-bounded, deduped
//!  ├─ 5. Assets    download once per URL, rasterise PDFs, OCR everything
//!  └─ 6. Chunks    ordered stream → materialized corpus text
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crawl2text::{ingest, IngestConfig, Source};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sources = vec![
//!         Source::website_with("https://docs.example.com", false, 2),
//!         Source::pdf("reports/q3.pdf"),
//!         Source::image("https://example.com/scan.png"),
//!     ];
//!     let output = ingest(&sources, IngestConfig::default()).await?;
//!     println!("{}", output.text);
//!     eprintln!(
//!         "{} chunks, {} errors, {} assets",
//!         output.stats.chunks, output.stats.errors, output.stats.assets_downloaded
//!     );
//!     Ok(())
//! }
//! ```
//!
//! Or stream chunks as they are produced:
//!
//! ```rust,no_run
//! use crawl2text::{ingest_stream, IngestConfig, Source};
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut stream = ingest_stream(
//!     vec![Source::website("https://example.com")],
//!     IngestConfig::default(),
//! )
//! .await?;
//! while let Some(chunk) = stream.next().await {
//!     println!("[{:?}] {}", chunk.kind, chunk.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## External tools
//!
//! | Tool | Needed for | Notes |
//! |------|-----------|-------|
//! | `tesseract` | image and PDF OCR | must be on `PATH`; language packs via `ocr_language` |
//! | pdfium | PDF rasterisation | shared library next to the executable or system-wide |
//! | Chromium/Chrome | `dynamic: true` sources only | static crawling never launches it |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `crawl2text` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! crawl2text = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chunk;
pub mod config;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod pipeline;
pub mod source;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chunk::{Chunk, ChunkKind};
pub use config::{IngestConfig, IngestConfigBuilder};
pub use error::IngestError;
pub use ingest::{ingest, ingest_sync, ingest_to_file, IngestOutput, IngestStats, Ingestor};
pub use ledger::{DownloadLedger, UrlLedger};
pub use pipeline::ocr::{OcrEngine, TesseractOcr};
pub use source::Source;
pub use stream::{ingest_stream, ChunkStream};
