//! Page fetching: plain HTTP GET or headless-browser rendering.
//!
//! Every page fetch goes through [`fetch_page`], which picks one of two
//! strategies:
//!
//! - **Static** (`dynamic = false`): a single `reqwest` GET. Fast, no
//!   external processes, returns the server's HTML as-is.
//! - **Rendered** (`dynamic = true`): launch headless Chromium, navigate,
//!   wait a fixed settle delay for scripts to populate the DOM, then read
//!   the serialized document back.
//!
//! The browser is scoped to a single fetch. Launch, navigate and teardown
//! all happen inside [`fetch_rendered`], and teardown runs on every exit
//! path, including render timeouts. Leaking a Chromium process is worse
//! than a failed fetch.

use crate::config::IngestConfig;
use crate::error::IngestError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, warn};

/// Build the shared HTTP client used for page fetches and asset downloads.
pub fn build_http_client(config: &IngestConfig) -> Result<reqwest::Client, IngestError> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .map_err(|e| IngestError::HttpClient(e.to_string()))
}

/// Fetch the HTML of `url`, rendering it in a headless browser when
/// `dynamic` is set.
pub async fn fetch_page(
    client: &reqwest::Client,
    url: &str,
    dynamic: bool,
    config: &IngestConfig,
) -> Result<String, IngestError> {
    if dynamic {
        fetch_rendered(url, config).await
    } else {
        fetch_static(client, url).await
    }
}

/// Plain GET. Non-2xx responses are errors; the body is returned verbatim.
async fn fetch_static(client: &reqwest::Client, url: &str) -> Result<String, IngestError> {
    debug!(url, "fetching static page");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| IngestError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| IngestError::FetchFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Launch headless Chromium, render `url`, return the settled DOM as HTML.
///
/// The whole navigate-settle-serialize sequence runs under
/// `render_timeout_secs`. Whatever happens inside that window, the browser
/// is closed and reaped before this function returns.
async fn fetch_rendered(url: &str, config: &IngestConfig) -> Result<String, IngestError> {
    debug!(url, settle_ms = config.settle_delay_ms, "rendering dynamic page");

    let browser_config = BrowserConfig::builder()
        .no_sandbox()
        .arg("--disable-gpu")
        .arg(format!("--user-agent={}", config.user_agent))
        .build()
        .map_err(|detail| IngestError::BrowserLaunch { detail })?;

    let (mut browser, mut handler) =
        Browser::launch(browser_config)
            .await
            .map_err(|e| IngestError::BrowserLaunch {
                detail: e.to_string(),
            })?;

    // The CDP handler must be polled for the browser connection to make
    // progress; it lives in its own task for the duration of the fetch.
    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    let rendered = tokio::time::timeout(
        Duration::from_secs(config.render_timeout_secs),
        render_dom(&browser, url, config),
    )
    .await;

    // Teardown runs on every path: success, navigation error, timeout.
    if let Err(e) = browser.close().await {
        warn!(url, error = %e, "browser close failed");
    }
    let _ = browser.wait().await;
    handler_task.abort();

    match rendered {
        Ok(result) => result,
        Err(_) => Err(IngestError::RenderTimeout {
            url: url.to_string(),
            secs: config.render_timeout_secs,
        }),
    }
}

/// Navigate, settle, serialize. Separated out so the caller can wrap the
/// whole sequence in one timeout.
async fn render_dom(
    browser: &Browser,
    url: &str,
    config: &IngestConfig,
) -> Result<String, IngestError> {
    let page = browser
        .new_page(url)
        .await
        .map_err(|e| IngestError::BrowserNavigation {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

    // Best effort; some pages never fire a load event and the settle delay
    // below covers them.
    let _ = page.wait_for_navigation().await;
    tokio::time::sleep(Duration::from_millis(config.settle_delay_ms)).await;

    let html = page
        .content()
        .await
        .map_err(|e| IngestError::BrowserNavigation {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

    if let Err(e) = page.close().await {
        debug!(url, error = %e, "page close failed");
    }

    Ok(html)
}
