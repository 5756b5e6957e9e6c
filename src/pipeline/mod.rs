//! Pipeline stages for source ingestion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different OCR engine) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//!          ┌──▶ digest ─────────────────────────┐
//! fetch ──▶│                                    ├──▶ chunks
//! (HTTP/   └──▶ links ──▶ download ──▶ ocr/pdf ─┘
//!  browser)     (scraper)  (ledger)    (tesseract)
//! ```
//!
//! 1. [`fetch`]    — retrieve a page's HTML, statically or browser-rendered
//! 2. [`digest`]   — heading-bucketed section digest + FAQ digest from the DOM
//! 3. [`links`]    — discover PDF/image assets and same-site links
//! 4. [`download`] — ledger-gated at-most-once asset download
//! 5. [`ocr`]      — OCR engine seam + image text extraction; CPU-bound work
//!    runs in `spawn_blocking`
//! 6. [`pdf`]      — rasterise pages via pdfium, OCR each; not async-safe, so
//!    the whole document is handled in one `spawn_blocking`
//! 7. [`crawl`]    — the recursive orchestrator tying the stages together
//!
//! Parsing is deliberately confined to synchronous helpers: a parsed
//! `scraper::Html` is not `Send` and must never be held across an `.await`.

pub mod crawl;
pub mod digest;
pub mod download;
pub mod fetch;
pub mod links;
pub mod ocr;
pub mod pdf;
