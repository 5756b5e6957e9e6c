//! Batch ingestion: dispatch sources, collect or stream chunks, clean up.
//!
//! [`Ingestor`] owns the long-lived pieces of the pipeline: the HTTP client,
//! the OCR engine, and the download ledger that survives across batches. One
//! call to [`Ingestor::run`] processes a whole list of sources in order and
//! hands back the materialized output; [`Ingestor::stream`] (in the `stream`
//! module) feeds the same producer through a channel instead.
//!
//! Whatever happens inside a batch, two things always hold when it ends:
//! the workspace directory is gone, and every source contributed either its
//! text or an inline error annotation. Partial failure is the normal case,
//! not the exceptional one.

use crate::chunk::{Chunk, ChunkSender};
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::ledger::{DownloadLedger, UrlLedger};
use crate::pipeline::crawl::Crawler;
use crate::pipeline::download::fetch_asset;
use crate::pipeline::fetch::build_http_client;
use crate::pipeline::ocr::{extract_image_text, OcrEngine, TesseractOcr};
use crate::pipeline::pdf::extract_pdf_text;
use crate::source::Source;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Summary counters for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    /// Number of sources in the batch.
    pub sources: usize,
    /// Total chunks emitted, every kind included.
    pub chunks: usize,
    /// Error chunks among them.
    pub errors: usize,
    /// Asset transfers that completed during this run. Failed attempts are
    /// not counted, even though their URLs stay claimed in the ledger.
    pub assets_downloaded: usize,
    /// Wall-clock duration of the batch.
    pub duration_ms: u64,
}

/// Materialized result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutput {
    /// The corpus text: content and error chunks joined by blank lines.
    pub text: String,
    /// Every emitted chunk, in emission order.
    pub chunks: Vec<Chunk>,
    pub stats: IngestStats,
}

/// The ingestion pipeline. Construct once, run many batches.
///
/// The download ledger lives inside the ingestor, so assets are fetched at
/// most once for as long as the instance lives, across batches included.
/// Visited sets, by contrast, are created fresh for every website source.
#[derive(Clone)]
pub struct Ingestor {
    config: IngestConfig,
    client: reqwest::Client,
    engine: Arc<dyn OcrEngine>,
    downloads: Arc<DownloadLedger>,
}

impl Ingestor {
    /// Build an ingestor from a validated configuration.
    ///
    /// When the config carries no OCR engine, a Tesseract-backed one is
    /// created from the config's language and DPI settings.
    pub fn new(config: IngestConfig) -> Result<Self, IngestError> {
        let client = build_http_client(&config)?;
        let engine: Arc<dyn OcrEngine> = match &config.ocr {
            Some(engine) => Arc::clone(engine),
            None => Arc::new(TesseractOcr::with_options(
                config.ocr_language.as_str(),
                config.dpi,
            )),
        };
        Ok(Self {
            config,
            client,
            engine,
            downloads: Arc::new(DownloadLedger::new()),
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Process every source in order and return the materialized output.
    ///
    /// This never returns an error: per-source failures are embedded in the
    /// output as error chunks and counted in the stats.
    pub async fn run(&self, sources: &[Source]) -> IngestOutput {
        let started = Instant::now();
        let downloads_before = self.downloads.completed();

        let (tx, mut rx) = ChunkSender::channel();
        self.produce(sources.to_vec(), tx).await;

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }

        let text = assemble_corpus(&chunks);
        let stats = IngestStats {
            sources: sources.len(),
            chunks: chunks.len(),
            errors: chunks.iter().filter(|c| c.is_error()).count(),
            assets_downloaded: self.downloads.completed() - downloads_before,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            sources = stats.sources,
            chunks = stats.chunks,
            errors = stats.errors,
            "batch complete"
        );
        IngestOutput { text, chunks, stats }
    }

    /// The single producer behind both the materialized and the streaming
    /// mode. Emits chunks in order and always removes the workspace before
    /// returning.
    pub(crate) async fn produce(&self, sources: Vec<Source>, chunks: ChunkSender) {
        info!(sources = sources.len(), "ingestion batch starting");

        for source in &sources {
            if !chunks.consumer_alive() {
                debug!("consumer gone, abandoning remaining sources");
                break;
            }
            match source {
                // ── Website: fresh visited set per top-level source ──
                Source::Website {
                    path,
                    dynamic,
                    depth,
                } => {
                    let visited = UrlLedger::new();
                    let crawler = Crawler {
                        client: &self.client,
                        config: &self.config,
                        engine: &self.engine,
                        downloads: &self.downloads,
                        chunks: &chunks,
                    };
                    crawler
                        .crawl(path.clone(), *dynamic, &visited, *depth)
                        .await;
                }
                // ── Standalone documents ──
                Source::Pdf { path } => self.process_pdf_source(path, &chunks).await,
                Source::Image { path } => self.process_image_source(path, &chunks).await,
            }
        }

        // ── Cleanup: the workspace never outlives the batch ──
        match tokio::fs::remove_dir_all(&self.config.workspace_dir).await {
            Ok(()) => debug!(dir = %self.config.workspace_dir.display(), "workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                dir = %self.config.workspace_dir.display(),
                error = %e,
                "workspace cleanup failed"
            ),
        }

        info!("ingestion batch finished");
    }

    async fn process_pdf_source(&self, path: &str, chunks: &ChunkSender) {
        let local = match self.resolve_source(path, chunks).await {
            Ok(Some(local)) => local,
            Ok(None) => return,
            Err(e) => {
                warn!(path, error = %e, "PDF source unavailable");
                chunks.emit(Chunk::error(format!("Error processing PDF {path}: {e}")));
                return;
            }
        };
        match extract_pdf_text(&local, &self.config, &self.engine).await {
            Ok(text) => {
                if !text.trim().is_empty() {
                    chunks.emit(Chunk::content(text));
                }
                chunks.emit(Chunk::completed(path));
            }
            Err(e) => {
                warn!(path, error = %e, "PDF extraction failed");
                chunks.emit(Chunk::error(format!("Error processing PDF {path}: {e}")));
            }
        }
    }

    async fn process_image_source(&self, path: &str, chunks: &ChunkSender) {
        let local = match self.resolve_source(path, chunks).await {
            Ok(Some(local)) => local,
            Ok(None) => return,
            Err(e) => {
                warn!(path, error = %e, "image source unavailable");
                chunks.emit(Chunk::error(format!("Error processing image {path}: {e}")));
                return;
            }
        };
        match extract_image_text(&local, &self.engine).await {
            Ok(text) => {
                if !text.trim().is_empty() {
                    chunks.emit(Chunk::content(text));
                }
                chunks.emit(Chunk::completed(path));
            }
            Err(e) => {
                warn!(path, error = %e, "image OCR failed");
                chunks.emit(Chunk::error(format!("Error processing image {path}: {e}")));
            }
        }
    }

    /// Resolve a standalone document source to a local path.
    ///
    /// Remote URLs go through the download ledger into the workspace, so a
    /// document already pulled during a crawl is not transferred again;
    /// `Ok(None)` means exactly that, with the skip notice already emitted.
    /// Local paths only need to exist.
    async fn resolve_source(
        &self,
        path: &str,
        chunks: &ChunkSender,
    ) -> Result<Option<PathBuf>, IngestError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            let url = Url::parse(path).map_err(|e| IngestError::InvalidUrl {
                url: path.to_string(),
                detail: e.to_string(),
            })?;
            return match fetch_asset(&self.client, &url, &self.config, &self.downloads).await {
                Ok(Some(local)) => Ok(Some(local)),
                Ok(None) => {
                    chunks.emit(Chunk::notice(format!(
                        "Skipping {path} (already downloaded)"
                    )));
                    Ok(None)
                }
                Err(e) => Err(e),
            };
        }

        // Anything else scheme-shaped (ftp://, file://, s3://) is a typo or
        // an unsupported protocol, not a filesystem path.
        if path.contains("://") {
            return Err(IngestError::InvalidSource {
                input: path.to_string(),
            });
        }

        let local = PathBuf::from(path);
        if !local.exists() {
            return Err(IngestError::FileNotFound { path: local });
        }
        Ok(Some(local))
    }
}

/// The corpus view of a chunk sequence: content and error chunks joined by
/// blank lines. Notices and completion markers are stream-time diagnostics
/// and stay out of the text handed to downstream consumers.
fn assemble_corpus(chunks: &[Chunk]) -> String {
    let parts: Vec<&str> = chunks
        .iter()
        .filter(|c| c.in_corpus())
        .map(|c| c.text.as_str())
        .collect();
    parts.join("\n\n")
}

/// One-shot convenience: build an [`Ingestor`], run one batch, return the
/// materialized output.
pub async fn ingest(
    sources: &[Source],
    config: IngestConfig,
) -> Result<IngestOutput, IngestError> {
    let ingestor = Ingestor::new(config)?;
    Ok(ingestor.run(sources).await)
}

/// Blocking wrapper around [`ingest`] for synchronous callers.
pub fn ingest_sync(
    sources: &[Source],
    config: IngestConfig,
) -> Result<IngestOutput, IngestError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| IngestError::Internal(format!("failed to create async runtime: {e}")))?;
    runtime.block_on(ingest(sources, config))
}

/// Run one batch and write the corpus text to `output_path`.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// crash mid-write cannot leave a torn output file behind.
pub async fn ingest_to_file(
    sources: &[Source],
    output_path: &Path,
    config: IngestConfig,
) -> Result<IngestStats, IngestError> {
    let output = ingest(sources, config).await?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| IngestError::OutputWriteFailed {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
    }

    let tmp = output_path.with_extension("txt.tmp");
    tokio::fs::write(&tmp, output.text.as_bytes())
        .await
        .map_err(|source| IngestError::OutputWriteFailed {
            path: tmp.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp, output_path)
        .await
        .map_err(|source| IngestError::OutputWriteFailed {
            path: output_path.to_path_buf(),
            source,
        })?;

    info!(path = %output_path.display(), bytes = output.text.len(), "corpus written");
    Ok(output.stats)
}
