//! Integration tests for the crawl-to-corpus pipeline.
//!
//! All HTTP traffic is served by wiremock servers and OCR runs through
//! in-process fake engines, so the suite is hermetic: no network, no
//! tesseract binary, no browser. Call-count expectations (`expect(N)`) are
//! verified when each mock server drops; that is how the at-most-once
//! download guarantee and the crawl bounds are pinned down.
//!
//! Run with:
//!   cargo test --test crawl_pipeline

use crawl2text::{
    ingest, ChunkKind, IngestConfig, IngestError, IngestOutput, Ingestor, OcrEngine, Source,
};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// OCR fake that recognises the same text in every image.
struct FixedOcr(&'static str);

impl OcrEngine for FixedOcr {
    fn name(&self) -> &str {
        "fixed"
    }
    fn recognize(&self, _path: &Path) -> Result<String, IngestError> {
        Ok(self.0.to_string())
    }
}

/// OCR fake that fails on every image.
struct FailingOcr;

impl OcrEngine for FailingOcr {
    fn name(&self) -> &str {
        "failing"
    }
    fn recognize(&self, path: &Path) -> Result<String, IngestError> {
        Err(IngestError::OcrFailed {
            path: path.to_path_buf(),
            detail: "no text layer".into(),
        })
    }
}

fn test_config(workspace: PathBuf, engine: Arc<dyn OcrEngine>) -> IngestConfig {
    IngestConfig::builder()
        .workspace_dir(workspace)
        .ocr(engine)
        .build()
        .expect("test config should validate")
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

fn done_count(output: &IngestOutput) -> usize {
    output
        .chunks
        .iter()
        .filter(|c| c.kind == ChunkKind::Completed)
        .count()
}

fn notice_count(output: &IngestOutput) -> usize {
    output
        .chunks
        .iter()
        .filter(|c| c.kind == ChunkKind::Notice)
        .count()
}

// ── Single page extraction ───────────────────────────────────────────────────

#[tokio::test]
async fn test_single_page_digest_becomes_the_corpus() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "<html><body><h1>Welcome</h1><p>Plain text wins.</p></body></html>",
    )
    .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("unused")));
    let output = ingest(&[Source::website(server.uri())], config)
        .await
        .expect("pipeline should start");

    assert_eq!(output.text, "Welcome\n- Plain text wins.");
    assert_eq!(output.stats.errors, 0);
    assert_eq!(done_count(&output), 1);
    let done = output
        .chunks
        .iter()
        .find(|c| c.kind == ChunkKind::Completed)
        .unwrap();
    assert!(done.text.starts_with("[done] "), "got: {}", done.text);
    assert!(done.text.contains(&server.uri()));
}

#[tokio::test]
async fn test_sections_and_faq_emit_as_separate_chunks() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "<html><body>\
         <h1>Setup</h1><p>Install it.</p>\
         <h2>FAQ</h2><p>Q: Cost?</p><p>A: Free.</p>\
         </body></html>",
    )
    .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("unused")));
    let output = ingest(&[Source::website(server.uri())], config)
        .await
        .unwrap();

    // The FAQ heading shows up twice on purpose: once inside the section
    // digest, once as the dedicated FAQ digest appended after the page.
    assert_eq!(
        output.text,
        "Setup\n- Install it.\n\nFAQ\n- Q: Cost?\n- A: Free.\n\nFAQ\nQ: Cost?\nA: Free."
    );
    let contents: Vec<_> = output
        .chunks
        .iter()
        .filter(|c| c.kind == ChunkKind::Content)
        .collect();
    assert_eq!(contents.len(), 2, "section digest + FAQ digest");
}

#[tokio::test]
async fn test_empty_page_contributes_nothing_to_the_corpus() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "<html><body><div>no headings anywhere</div></body></html>",
    )
    .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("unused")));
    let output = ingest(&[Source::website(server.uri())], config)
        .await
        .unwrap();

    assert!(output.text.is_empty(), "got: {:?}", output.text);
    assert_eq!(output.stats.errors, 0);
    // The page is still observable through its completion marker.
    assert_eq!(output.chunks.len(), 1);
    assert_eq!(output.chunks[0].kind, ChunkKind::Completed);
}

// ── Crawl bounds: depth, fan-out, revisits ───────────────────────────────────

#[tokio::test]
async fn test_crawl_respects_the_depth_budget() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><h1>Root</h1><a href="/level1">next</a></body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/level1",
        r#"<html><body><h1>Level one</h1><a href="/level2">deeper</a></body></html>"#,
    )
    .await;
    // Two hops were granted; the third level must never be requested.
    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(html_page("<h1>Too deep</h1>"))
        .expect(0)
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("unused")));
    let output = ingest(
        &[Source::website_with(server.uri(), false, 2)],
        config,
    )
    .await
    .unwrap();

    assert_eq!(done_count(&output), 2, "root and level1 only");
    assert!(output.text.contains("Root"));
    assert!(output.text.contains("Level one"));
    assert!(!output.text.contains("Too deep"));
}

#[tokio::test]
async fn test_fan_out_is_capped_per_page() {
    let server = MockServer::start().await;

    // A hub page with 50 internal links; only the first five may be crawled.
    let mut root = String::from("<html><body><h1>Hub</h1>");
    for i in 0..50 {
        root.push_str(&format!(r#"<a href="/c{i}">child {i}</a>"#));
    }
    root.push_str("</body></html>");
    mount_page(&server, "/", &root).await;

    for i in 0..5 {
        Mock::given(method("GET"))
            .and(path(format!("/c{i}")))
            .respond_with(html_page(&format!("<h1>Child {i}</h1>")))
            .expect(1)
            .mount(&server)
            .await;
    }
    // Mocks match in mount order, so this catch-all sees exactly the
    // requests no earlier mock claimed — i.e. any link past the cap.
    Mock::given(method("GET"))
        .respond_with(html_page("<h1>Past the cap</h1>"))
        .expect(0)
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("unused")));
    let output = ingest(
        &[Source::website_with(server.uri(), false, 2)],
        config,
    )
    .await
    .unwrap();

    assert_eq!(done_count(&output), 6, "root + five children");
    assert!(output.text.contains("Child 0"));
    assert!(output.text.contains("Child 4"));
    assert!(!output.text.contains("Past the cap"));
}

#[tokio::test]
async fn test_cyclic_links_terminate_via_the_visited_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page(
            r#"<html><body><h1>A</h1><a href="/b">b</a></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page(
            r#"<html><body><h1>B</h1><a href="/a">a</a></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("unused")));
    // Budget for three hops; the cycle must burn out after two pages.
    let output = ingest(
        &[Source::website_with(format!("{}/a", server.uri()), false, 3)],
        config,
    )
    .await
    .unwrap();

    assert_eq!(done_count(&output), 2);
    assert!(output.text.contains("A"));
    assert!(output.text.contains("B"));
}

#[tokio::test]
async fn test_visited_resets_per_source_but_downloads_do_not() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<html><body><h1>Home</h1><img src="/pic.png"></body></html>"#,
        ))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pic.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("PIC WORDS")));
    // The same site listed twice: each source gets a fresh visited set, so
    // the page is fetched twice — but the image rides the process-wide
    // download ledger and transfers only once.
    let output = ingest(
        &[Source::website(server.uri()), Source::website(server.uri())],
        config,
    )
    .await
    .unwrap();

    assert_eq!(output.text, "Home\n\nPIC WORDS\n\nHome");
    assert_eq!(done_count(&output), 2);
    assert_eq!(notice_count(&output), 1, "one already-downloaded skip");
    assert_eq!(output.stats.assets_downloaded, 1);
}

// ── Asset handling ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_shared_asset_downloads_once_within_a_crawl() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/a">a</a><a href="/b">b</a></body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/a",
        r#"<html><body><img src="/shared/scan.png"></body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/b",
        r#"<html><body><img src="/shared/scan.png"></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/shared/scan.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("SCAN TEXT")));
    let output = ingest(
        &[Source::website_with(server.uri(), false, 2)],
        config,
    )
    .await
    .unwrap();

    assert_eq!(output.text, "SCAN TEXT", "OCR text appears exactly once");
    assert_eq!(output.stats.assets_downloaded, 1);
    let skip = output
        .chunks
        .iter()
        .find(|c| c.kind == ChunkKind::Notice)
        .expect("second reference should emit a skip notice");
    assert!(skip.text.starts_with("Skipping "), "got: {}", skip.text);
    assert!(skip.text.ends_with("(already downloaded)"));
}

#[tokio::test]
async fn test_remote_document_sources_share_the_download_ledger() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><img src="/pic.png"></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/pic.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("LEDGER TEXT")));
    // The crawl downloads the image first; the explicit image source then
    // finds it in the ledger and skips instead of re-transferring.
    let output = ingest(
        &[
            Source::website(server.uri()),
            Source::image(format!("{}/pic.png", server.uri())),
        ],
        config,
    )
    .await
    .unwrap();

    assert_eq!(output.text.matches("LEDGER TEXT").count(), 1);
    assert_eq!(notice_count(&output), 1);
    assert_eq!(done_count(&output), 1, "only the crawled page completes");
    assert_eq!(output.stats.errors, 0);
}

// ── Failure containment ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_broken_child_page_collapses_to_one_error_chunk() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><h1>Root</h1><a href="/missing">gone</a></body></html>"#,
    )
    .await;
    // "/missing" is deliberately not mounted; wiremock answers 404.

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("unused")));
    let output = ingest(
        &[Source::website_with(server.uri(), false, 2)],
        config,
    )
    .await
    .unwrap();

    assert_eq!(output.stats.errors, 1);
    assert!(output.text.contains("Root"), "parent content survives");
    assert!(output.text.contains("Error processing website"));
    assert!(output.text.contains("404"));
    assert_eq!(done_count(&output), 1, "the failed child never completes");
}

#[tokio::test]
async fn test_broken_asset_degrades_without_stopping_the_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><h1>Pics</h1><img src="/broken.png"><img src="/fine.jpg"></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken.png"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fine.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("FINE TEXT")));
    let output = ingest(&[Source::website(server.uri())], config)
        .await
        .unwrap();

    assert_eq!(output.stats.errors, 1);
    assert!(output.text.contains("Pics"));
    assert!(output.text.contains("Error downloading"));
    assert!(output.text.contains("500"));
    assert!(
        output.text.contains("FINE TEXT"),
        "the sibling asset is still processed"
    );
    assert_eq!(done_count(&output), 1, "the page itself completes");
}

#[tokio::test]
async fn test_failed_transfers_stay_out_of_the_download_stat() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><h1>Mixed</h1><img src="/broken.png"><img src="/fine.png"></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken.png"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fine.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("FINE")));
    let output = ingest(&[Source::website(server.uri())], config)
        .await
        .unwrap();

    assert_eq!(output.stats.errors, 1);
    assert_eq!(
        output.stats.assets_downloaded, 1,
        "the refused transfer must not count as a download"
    );
}

#[tokio::test]
async fn test_failing_ocr_becomes_an_inline_error() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><img src="/scan.png"></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/scan.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png bytes".to_vec()))
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FailingOcr));
    let output = ingest(&[Source::website(server.uri())], config)
        .await
        .unwrap();

    assert_eq!(output.stats.errors, 1);
    assert!(output.text.contains("Error processing image"));
    assert!(output.text.contains("scan.png"));
    assert_eq!(done_count(&output), 1);
}

#[tokio::test]
async fn test_unreadable_pdf_degrades_inline() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><h1>Docs</h1><a href="/doc.pdf">report</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not a pdf at all".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("unused")));
    // Depth 1: the pdf link is downloaded as an asset but never crawled as
    // a child page. Extraction fails whether or not a pdfium library is
    // present — garbage bytes load nowhere — and that failure must stay
    // scoped to the asset.
    let output = ingest(&[Source::website(server.uri())], config)
        .await
        .unwrap();

    assert_eq!(output.stats.errors, 1);
    assert!(output.text.contains("Docs"));
    assert!(output.text.contains("Error processing PDF"));
    assert!(output.text.contains("doc.pdf"));
    assert_eq!(done_count(&output), 1);
}

#[tokio::test]
async fn test_batch_continues_after_a_dead_website() {
    let good = MockServer::start().await;
    mount_page(
        &good,
        "/",
        "<html><body><h1>Alive</h1><p>Still here.</p></body></html>",
    )
    .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("unused")));
    // A port nothing listens on: connection refused, not an HTTP error.
    let output = ingest(
        &[
            Source::website("http://127.0.0.1:9".to_string()),
            Source::website(good.uri()),
        ],
        config,
    )
    .await
    .unwrap();

    assert_eq!(output.stats.errors, 1);
    assert!(output.text.contains("Error processing website"));
    assert!(output.text.contains("Alive"), "second source still ran");
    assert_eq!(done_count(&output), 1);
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stream_delivers_chunks_in_emission_order() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "<html><body><h1>Step</h1><p>One.</p></body></html>",
    )
    .await;

    let scratch = tempfile::tempdir().unwrap();
    let config = test_config(scratch.path().join("ws"), Arc::new(FixedOcr("unused")));
    let ingestor = Ingestor::new(config).unwrap();

    let mut stream = ingestor.stream(vec![
        Source::website(server.uri()),
        Source::image("definitely/missing.png"),
    ]);
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk);
    }

    let kinds: Vec<ChunkKind> = chunks.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![ChunkKind::Content, ChunkKind::Completed, ChunkKind::Error]
    );
    assert_eq!(chunks[0].text, "Step\n- One.");
    assert!(chunks[1].text.starts_with("[done] "));
    assert!(chunks[2].text.starts_with("Error processing image"));
}

// ── Workspace cleanup ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_workspace_is_removed_even_after_downloads() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><img src="/pic.png"></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/pic.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png bytes".to_vec()))
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let workspace = scratch.path().join("ws");
    let config = test_config(workspace.clone(), Arc::new(FixedOcr("TEXT")));
    let output = ingest(&[Source::website(server.uri())], config)
        .await
        .unwrap();

    assert!(output.text.contains("TEXT"));
    assert!(
        !workspace.exists(),
        "staged assets must not outlive the batch"
    );
}
