//! Configuration types for the ingestion pipeline.
//!
//! All pipeline behaviour is controlled through [`IngestConfig`], built via
//! its [`IngestConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::IngestError;
use crate::pipeline::ocr::OcrEngine;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for an ingestion run.
///
/// Built via [`IngestConfig::builder()`] or using
/// [`IngestConfig::default()`].
///
/// # Example
/// ```rust
/// use crawl2text::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .settle_delay_ms(500)
///     .max_child_links(3)
///     .workspace_dir("scratch")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct IngestConfig {
    /// User-Agent header sent with every HTTP request. Default: `"Mozilla/5.0"`.
    ///
    /// Many sites answer a bare library UA with 403 or a bot-wall page. A
    /// browser-shaped UA keeps the static fetch path working on the same
    /// pages the dynamic path would render.
    pub user_agent: String,

    /// Timeout for a single page GET in seconds. Default: 30.
    pub http_timeout_secs: u64,

    /// Timeout for one asset download in seconds. Default: 120.
    ///
    /// Assets (PDFs, scans) are routinely 10–100× larger than the HTML that
    /// referenced them, so they get their own, longer bound instead of
    /// inheriting the page timeout.
    pub download_timeout_secs: u64,

    /// Settle delay after navigation on a dynamic fetch, in milliseconds.
    /// Default: 2000.
    ///
    /// Client-side frameworks keep mutating the DOM after `load` fires.
    /// There is no universal "rendering finished" signal, so the pipeline
    /// waits a fixed delay before capturing the DOM. Raise it for slow SPAs,
    /// lower it for mostly-static pages behind a JS shell.
    pub settle_delay_ms: u64,

    /// Wall-clock bound on one whole dynamic fetch (navigate + settle +
    /// capture) in seconds. Default: 30.
    ///
    /// The settle delay alone bounds nothing if navigation itself hangs.
    /// This cap guarantees a rendered fetch always returns; the browser is
    /// torn down either way.
    pub render_timeout_secs: u64,

    /// Maximum number of discovered internal links followed per page.
    /// Default: 5.
    ///
    /// The fan-out cap is what keeps a bounded-depth crawl bounded in width
    /// too: depth `d` with fan-out `f` visits at most `f^d` pages. Set to 0
    /// to extract single pages without following links at all.
    pub max_child_links: usize,

    /// Maximum sibling paragraphs/list items collected after an FAQ-labeled
    /// element. Default: 5.
    pub faq_follow_limit: usize,

    /// Rendering DPI used when rasterising PDF pages for OCR. Range: 72–600.
    /// Default: 300.
    ///
    /// Tesseract's accuracy degrades sharply below ~150 DPI and plateaus
    /// around 300; going higher mostly costs memory and time.
    pub dpi: u32,

    /// Maximum rendered page dimension (width or height) in pixels.
    /// Default: 4000.
    ///
    /// A safety cap independent of DPI: a 300-DPI render of an A0 poster
    /// would be a 10 000 × 14 000 px allocation. Either dimension is capped,
    /// the other scales proportionally.
    pub max_rendered_pixels: u32,

    /// Directory where downloaded assets are staged. Default: `temp`.
    ///
    /// Created lazily on first download and removed recursively when the
    /// batch finishes, whatever happened in between. Relative paths resolve
    /// against the process working directory.
    pub workspace_dir: PathBuf,

    /// Language hint passed to the default OCR engine. Default: `"eng"`.
    pub ocr_language: String,

    /// Pre-constructed OCR engine. If `None`, a Tesseract-backed engine is
    /// created with [`Self::ocr_language`]. Tests inject mock engines here.
    pub ocr: Option<Arc<dyn OcrEngine>>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_string(),
            http_timeout_secs: 30,
            download_timeout_secs: 120,
            settle_delay_ms: 2000,
            render_timeout_secs: 30,
            max_child_links: 5,
            faq_follow_limit: 5,
            dpi: 300,
            max_rendered_pixels: 4000,
            workspace_dir: PathBuf::from("temp"),
            ocr_language: "eng".to_string(),
            ocr: None,
        }
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("user_agent", &self.user_agent)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("max_child_links", &self.max_child_links)
            .field("faq_follow_limit", &self.faq_follow_limit)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("workspace_dir", &self.workspace_dir)
            .field("ocr_language", &self.ocr_language)
            .field("ocr", &self.ocr.as_ref().map(|_| "<dyn OcrEngine>"))
            .finish()
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.config.http_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.config.settle_delay_ms = ms;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs.max(1);
        self
    }

    pub fn max_child_links(mut self, n: usize) -> Self {
        self.config.max_child_links = n;
        self
    }

    pub fn faq_follow_limit(mut self, n: usize) -> Self {
        self.config.faq_follow_limit = n;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn workspace_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.workspace_dir = dir.into();
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr = Some(engine);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, IngestError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(IngestError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.user_agent.trim().is_empty() {
            return Err(IngestError::InvalidConfig(
                "user_agent must not be empty".into(),
            ));
        }
        // The workspace is removed recursively at the end of every batch;
        // refuse paths where that removal could be catastrophic.
        if c.workspace_dir.as_os_str().is_empty() {
            return Err(IngestError::InvalidConfig(
                "workspace_dir must not be empty".into(),
            ));
        }
        if c.workspace_dir == PathBuf::from("/") || c.workspace_dir == PathBuf::from(".") {
            return Err(IngestError::InvalidConfig(format!(
                "workspace_dir '{}' is not a safe directory to remove",
                c.workspace_dir.display()
            )));
        }
        Ok(self.config)
    }
}
