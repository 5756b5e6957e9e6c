//! CLI binary for crawl2text.
//!
//! A thin shim over the library crate that maps CLI flags to an
//! `IngestConfig`, auto-detects the input kind (URL, manifest, PDF, image),
//! and prints or writes the extracted corpus.

use anyhow::{Context, Result};
use clap::Parser;
use crawl2text::{
    ingest_to_file, Chunk, ChunkKind, IngestConfig, Ingestor, Source,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract one page to stdout
  crawl2text https://example.com

  # Crawl two levels deep, write the corpus to a file
  crawl2text https://docs.example.com --depth 2 -o corpus.txt

  # JavaScript-rendered page (launches headless Chromium once)
  crawl2text https://app.example.com --dynamic

  # OCR a local scan or a PDF
  crawl2text scan.png
  crawl2text report.pdf -o report.txt

  # Mixed batch from a JSON manifest
  crawl2text sources.json -o corpus.txt

  # Watch chunks arrive as they are produced
  crawl2text https://example.com --depth 2 --stream

MANIFEST FORMAT (JSON):
  [
    {"type": "website", "path": "https://docs.example.com", "dynamic": false, "depth": 2},
    {"type": "pdf",     "path": "reports/q3.pdf"},
    {"type": "image",   "path": "https://example.com/scan.png"}
  ]
  `path` may be a URL or a local file for pdf/image entries.

ENVIRONMENT VARIABLES:
  CRAWL2TEXT_OUTPUT            Default output file
  CRAWL2TEXT_WORKSPACE         Asset staging directory (default: temp)
  CRAWL2TEXT_USER_AGENT        User-Agent header for all requests
  CRAWL2TEXT_SETTLE_MS         Settle delay for dynamic pages (milliseconds)
  CRAWL2TEXT_DPI               PDF rasterisation DPI (72-600)
  CRAWL2TEXT_OCR_LANG          Tesseract language code(s): eng, deu, eng+fra, ...

SETUP:
  1. Install tesseract (OCR):     apt install tesseract-ocr / brew install tesseract
  2. Provide pdfium (PDF pages):  place libpdfium next to the executable,
                                  or install it system-wide
  3. Chromium/Chrome is only needed for --dynamic sources.
"#;

/// Crawl websites and OCR documents into one plain-text corpus.
#[derive(Parser, Debug)]
#[command(
    name = "crawl2text",
    version,
    about = "Crawl websites and OCR documents into one plain-text corpus",
    long_about = "Ingest web pages (static or JavaScript-rendered), PDF documents, and raster \
images into a single plain-text corpus. Websites are crawled recursively with a bounded depth \
and fan-out; referenced PDFs and images are downloaded once and OCR-ed; failures degrade into \
inline error annotations instead of aborting the batch.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// URL, JSON source manifest, PDF, or image file.
    input: String,

    /// Render the page in a headless browser before extraction (websites only).
    #[arg(long, env = "CRAWL2TEXT_DYNAMIC")]
    dynamic: bool,

    /// Crawl depth: number of link hops permitted from the starting URL.
    #[arg(long, env = "CRAWL2TEXT_DEPTH", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    depth: u32,

    /// Write the corpus to this file instead of stdout.
    #[arg(short, long, env = "CRAWL2TEXT_OUTPUT")]
    output: Option<PathBuf>,

    /// Print chunks as they are produced instead of waiting for the batch.
    #[arg(long, conflicts_with_all = ["output", "json"])]
    stream: bool,

    /// Output the full result (chunks + stats) as JSON.
    #[arg(long, env = "CRAWL2TEXT_JSON")]
    json: bool,

    /// Directory where downloaded assets are staged (removed afterwards).
    #[arg(long, env = "CRAWL2TEXT_WORKSPACE", default_value = "temp")]
    workspace: PathBuf,

    /// User-Agent header for all HTTP requests.
    #[arg(long, env = "CRAWL2TEXT_USER_AGENT")]
    user_agent: Option<String>,

    /// Settle delay after navigation on dynamic fetches, in milliseconds.
    #[arg(long, env = "CRAWL2TEXT_SETTLE_MS", default_value_t = 2000)]
    settle_ms: u64,

    /// Maximum child links followed per page.
    #[arg(long, env = "CRAWL2TEXT_MAX_LINKS", default_value_t = 5)]
    max_links: usize,

    /// PDF rasterisation DPI (72-600).
    #[arg(long, env = "CRAWL2TEXT_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract language code(s), e.g. eng, deu, eng+fra.
    #[arg(long, env = "CRAWL2TEXT_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Page fetch timeout in seconds.
    #[arg(long, env = "CRAWL2TEXT_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Asset download timeout in seconds.
    #[arg(long, env = "CRAWL2TEXT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "CRAWL2TEXT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CRAWL2TEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the corpus itself.
    #[arg(short, long, env = "CRAWL2TEXT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library logs would tear through the spinner and the streamed corpus,
    // so INFO is reserved for the no-progress path; verbose wins over all.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.stream;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress || cli.stream {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Resolve input and configuration ──────────────────────────────────
    let sources = build_sources(&cli)?;
    let config = build_config(&cli)?;
    let ingestor = Ingestor::new(config).context("Failed to initialise the pipeline")?;

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Ingesting {} source(s)…", sources.len()))
        );
    }

    // ── Streaming mode: print chunks as they arrive ──────────────────────
    if cli.stream {
        let mut stream = ingestor.stream(sources);
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        let mut errors = 0usize;

        while let Some(chunk) = stream.next().await {
            match chunk.kind {
                ChunkKind::Content | ChunkKind::Error => {
                    if chunk.is_error() {
                        errors += 1;
                    }
                    handle
                        .write_all(chunk.text.as_bytes())
                        .context("Failed to write to stdout")?;
                    handle.write_all(b"\n\n").ok();
                    handle.flush().ok();
                }
                ChunkKind::Notice => {
                    if !cli.quiet {
                        eprintln!("  {} {}", dim("·"), dim(&chunk.text));
                    }
                }
                ChunkKind::Completed => {
                    if !cli.quiet {
                        eprintln!("  {} {}", green("✓"), dim(&chunk.text));
                    }
                }
            }
        }
        if !cli.quiet && errors > 0 {
            eprintln!("{} {} error chunk(s) embedded in the corpus", cyan("⚠"), errors);
        }
        return Ok(());
    }

    // ── JSON mode: full materialized output ──────────────────────────────
    if cli.json {
        let output = ingestor.run(&sources).await;
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    // ── File output: atomic write via the library ────────────────────────
    if let Some(ref output_path) = cli.output {
        let bar = show_progress.then(|| spinner("Ingesting"));
        let stats = ingest_to_file(&sources, output_path, ingestor.config().clone())
            .await
            .context("Ingestion failed")?;
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        if !cli.quiet {
            eprintln!(
                "{}  {} chunk(s)  {} error(s)  {}ms  →  {}",
                if stats.errors == 0 { green("✔") } else { cyan("⚠") },
                stats.chunks,
                if stats.errors == 0 {
                    stats.errors.to_string()
                } else {
                    red(&stats.errors.to_string())
                },
                stats.duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
        return Ok(());
    }

    // ── Default: drive the stream behind a spinner, print at the end ─────
    let started = Instant::now();
    let bar = show_progress.then(|| spinner("Crawling"));
    let mut stream = ingestor.stream(sources);
    let mut chunks: Vec<Chunk> = Vec::new();

    while let Some(chunk) = stream.next().await {
        if let Some(ref bar) = bar {
            match chunk.kind {
                ChunkKind::Completed => {
                    bar.println(format!("  {} {}", green("✓"), dim(&chunk.text)));
                }
                ChunkKind::Error => {
                    bar.println(format!("  {} {}", red("✗"), first_line(&chunk.text)));
                }
                ChunkKind::Notice => {
                    bar.println(format!("  {} {}", dim("·"), dim(&chunk.text)));
                }
                ChunkKind::Content => {
                    bar.set_message(format!("{} chunk(s) extracted", chunks.len() + 1));
                }
            }
        }
        chunks.push(chunk);
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let corpus: Vec<&str> = chunks
        .iter()
        .filter(|c| c.in_corpus())
        .map(|c| c.text.as_str())
        .collect();
    let errors = chunks.iter().filter(|c| c.is_error()).count();

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let text = corpus.join("\n\n");
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.is_empty() && !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    drop(handle);

    if !cli.quiet {
        eprintln!(
            "{}  {} chunk(s)  {} error(s)  {}ms",
            if errors == 0 { green("✔") } else { cyan("⚠") },
            chunks.len(),
            if errors == 0 {
                errors.to_string()
            } else {
                red(&errors.to_string())
            },
            started.elapsed().as_millis(),
        );
    }

    Ok(())
}

fn spinner(prefix: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix(prefix.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn first_line(s: &str) -> String {
    let line = s.lines().next().unwrap_or("");
    // Cut by characters, not bytes: error text can carry non-ASCII titles.
    match line.char_indices().nth(99) {
        Some((cut, _)) => format!("{}\u{2026}", &line[..cut]),
        None => line.to_string(),
    }
}

/// Map the positional input to a source list.
///
/// URLs become website sources with the CLI's dynamic/depth flags; local
/// files dispatch on extension; a `.json` file is read as a full manifest.
fn build_sources(cli: &Cli) -> Result<Vec<Source>> {
    let input = cli.input.trim();

    if input.starts_with("http://") || input.starts_with("https://") {
        return Ok(vec![Source::website_with(input, cli.dynamic, cli.depth)]);
    }

    let path = Path::new(input);
    if !path.exists() {
        anyhow::bail!(
            "input '{input}' is neither a URL nor an existing file\n\
             Expected an http(s) URL, a .json manifest, a .pdf, or a .png/.jpg/.jpeg image."
        );
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "json" => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read manifest '{input}'"))?;
            let sources: Vec<Source> = serde_json::from_str(&raw)
                .with_context(|| format!("Manifest '{input}' is not a valid source list"))?;
            if sources.is_empty() {
                anyhow::bail!("Manifest '{input}' contains no sources");
            }
            Ok(sources)
        }
        "pdf" => Ok(vec![Source::pdf(input)]),
        "png" | "jpg" | "jpeg" => Ok(vec![Source::image(input)]),
        _ => anyhow::bail!(
            "Unsupported input '{input}'\n\
             Expected an http(s) URL, a .json manifest, a .pdf, or a .png/.jpg/.jpeg image."
        ),
    }
}

/// Map CLI args to an `IngestConfig`.
fn build_config(cli: &Cli) -> Result<IngestConfig> {
    let mut builder = IngestConfig::builder()
        .http_timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout)
        .settle_delay_ms(cli.settle_ms)
        .max_child_links(cli.max_links)
        .dpi(cli.dpi)
        .ocr_language(cli.ocr_lang.clone())
        .workspace_dir(&cli.workspace);

    if let Some(ref ua) = cli.user_agent {
        builder = builder.user_agent(ua.clone());
    }

    builder.build().context("Invalid configuration")
}
