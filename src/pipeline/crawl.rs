//! Recursive crawl orchestration.
//!
//! [`Crawler::crawl`] is the heart of the pipeline: fetch one page, digest
//! it, follow a bounded number of same-site links, pull the assets it
//! references, and emit everything as chunks in a stable order. Recursion is
//! bounded two ways at once: the per-run visited ledger makes every URL a
//! one-shot, and each hop spends one unit of the depth budget.
//!
//! Failure containment is the other core contract. A page that cannot be
//! fetched, a PDF that will not render, an image OCR that errors: each one
//! becomes an error chunk in the stream, scoped to the branch that failed.
//! Nothing here aborts a sibling, a parent, or the batch.

use crate::chunk::{Chunk, ChunkSender};
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::ledger::{DownloadLedger, UrlLedger};
use crate::pipeline::digest::{faq_digest, section_digest};
use crate::pipeline::download::fetch_asset;
use crate::pipeline::fetch::fetch_page;
use crate::pipeline::links::{discover_links, DiscoveredLinks};
use crate::pipeline::ocr::{extract_image_text, OcrEngine};
use crate::pipeline::pdf::extract_pdf_text;
use futures::future::BoxFuture;
use scraper::Html;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Borrowed view of everything one crawl tree needs. Cheap to pass down the
/// recursion; the owning handles live in the ingestor.
pub(crate) struct Crawler<'a> {
    pub client: &'a reqwest::Client,
    pub config: &'a IngestConfig,
    pub engine: &'a Arc<dyn OcrEngine>,
    /// Process-lifetime download ledger, shared across crawl trees.
    pub downloads: &'a DownloadLedger,
    pub chunks: &'a ChunkSender,
}

/// Everything extracted from one parsed page. `Html` itself is not `Send`,
/// so the tree is parsed and dropped inside [`analyze`] and only these owned
/// results cross await points.
struct PageAnalysis {
    sections: String,
    faq: String,
    links: DiscoveredLinks,
}

fn analyze(html: &str, base: &Url, config: &IngestConfig) -> PageAnalysis {
    let doc = Html::parse_document(html);
    PageAnalysis {
        sections: section_digest(&doc),
        faq: faq_digest(&doc, config.faq_follow_limit),
        links: discover_links(&doc, base),
    }
}

impl Crawler<'_> {
    /// Crawl `url` and everything reachable under the given budget.
    ///
    /// Re-entry on a visited URL and an exhausted depth budget are both
    /// silent no-ops. Any failure inside the call collapses into one error
    /// chunk naming the URL; success ends with a completion marker.
    ///
    /// Boxed because the future recurses through itself.
    pub(crate) fn crawl<'s>(
        &'s self,
        url: String,
        dynamic: bool,
        visited: &'s UrlLedger,
        depth: u32,
    ) -> BoxFuture<'s, ()> {
        Box::pin(async move {
            if depth == 0 {
                debug!(url, "depth budget exhausted");
                return;
            }
            // Claiming before the fetch is what makes re-entry impossible:
            // whichever branch claims first owns the URL for this run.
            if !visited.claim(&url) {
                debug!(url, "already visited in this run");
                return;
            }
            if !self.chunks.consumer_alive() {
                return;
            }

            info!(url, depth, dynamic, "crawling page");
            match self.crawl_page(&url, dynamic, visited, depth).await {
                Ok(()) => self.chunks.emit(Chunk::completed(&url)),
                Err(e) => {
                    warn!(url, error = %e, "page crawl failed");
                    self.chunks
                        .emit(Chunk::error(format!("Error processing website {url}: {e}")));
                }
            }
        })
    }

    async fn crawl_page(
        &self,
        url: &str,
        dynamic: bool,
        visited: &UrlLedger,
        depth: u32,
    ) -> Result<(), IngestError> {
        let base = Url::parse(url).map_err(|e| IngestError::InvalidUrl {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        // ── Step 1: Fetch the page ──
        let html = fetch_page(self.client, url, dynamic, self.config).await?;

        // ── Step 2: Parse once, extract all three views ──
        let analysis = analyze(&html, &base, self.config);

        if !analysis.sections.is_empty() {
            self.chunks.emit(Chunk::content(analysis.sections));
        }

        // ── Step 3: Recurse into child links ──
        // Children are always fetched statically; dynamic rendering is a
        // top-level privilege, which caps browser launches at one per tree.
        for child in analysis
            .links
            .children
            .iter()
            .take(self.config.max_child_links)
        {
            self.crawl(child.to_string(), false, visited, depth - 1).await;
        }

        // ── Step 4: Referenced assets, PDFs then images ──
        for pdf_url in &analysis.links.pdfs {
            if !self.chunks.consumer_alive() {
                return Ok(());
            }
            self.process_pdf_asset(pdf_url).await;
        }
        for image_url in &analysis.links.images {
            if !self.chunks.consumer_alive() {
                return Ok(());
            }
            self.process_image_asset(image_url).await;
        }

        // ── Step 5: FAQ digest ──
        if !analysis.faq.is_empty() {
            self.chunks.emit(Chunk::content(analysis.faq));
        }

        Ok(())
    }

    /// Download and extract one referenced PDF. Every outcome becomes a
    /// chunk; none of them becomes an `Err`.
    async fn process_pdf_asset(&self, url: &Url) {
        match fetch_asset(self.client, url, self.config, self.downloads).await {
            Ok(Some(path)) => {
                match extract_pdf_text(&path, self.config, self.engine).await {
                    Ok(text) => {
                        if !text.trim().is_empty() {
                            self.chunks.emit(Chunk::content(text));
                        }
                    }
                    Err(e) => {
                        warn!(url = %url, error = %e, "PDF extraction failed");
                        self.chunks
                            .emit(Chunk::error(format!("Error processing PDF {url}: {e}")));
                    }
                }
            }
            Ok(None) => {
                self.chunks
                    .emit(Chunk::notice(format!("Skipping {url} (already downloaded)")));
            }
            Err(e) => {
                warn!(url = %url, error = %e, "asset download failed");
                self.chunks
                    .emit(Chunk::error(format!("Error downloading {url}: {e}")));
            }
        }
    }

    /// Download and OCR one referenced image, with the same all-chunks
    /// degradation as PDFs.
    async fn process_image_asset(&self, url: &Url) {
        match fetch_asset(self.client, url, self.config, self.downloads).await {
            Ok(Some(path)) => {
                match extract_image_text(&path, self.engine).await {
                    Ok(text) => {
                        if !text.trim().is_empty() {
                            self.chunks.emit(Chunk::content(text));
                        }
                    }
                    Err(e) => {
                        warn!(url = %url, error = %e, "image OCR failed");
                        self.chunks
                            .emit(Chunk::error(format!("Error processing image {url}: {e}")));
                    }
                }
            }
            Ok(None) => {
                self.chunks
                    .emit(Chunk::notice(format!("Skipping {url} (already downloaded)")));
            }
            Err(e) => {
                warn!(url = %url, error = %e, "asset download failed");
                self.chunks
                    .emit(Chunk::error(format!("Error downloading {url}: {e}")));
            }
        }
    }
}
