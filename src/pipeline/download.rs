//! Asset downloading with at-most-once semantics per process.

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::ledger::DownloadLedger;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

/// Local filename for a downloaded asset.
///
/// Two distinct URLs can share a trailing path segment (`/a/logo.png` and
/// `/b/logo.png`), so the name is keyed by a hash of the full URL with the
/// readable basename kept as a suffix for debuggability.
pub(crate) fn asset_filename(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    let key = hex::encode(&digest[..8]);

    let basename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(sanitize)
        .unwrap_or_else(|| "asset".to_string());

    format!("{key}_{basename}")
}

fn sanitize(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .take(80)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "asset".to_string()
    } else {
        cleaned
    }
}

/// Download `url` into the workspace directory, at most once per ledger.
///
/// Returns `Ok(None)` when the ledger already holds the URL: the asset was
/// handled earlier (or is being handled right now) and the caller has
/// nothing further to do. The claim is taken before the transfer starts and
/// is never rolled back, so a failed download is not retried on the next
/// encounter of the same URL. Only transfers that run to completion are
/// tallied on the ledger as downloads.
pub async fn fetch_asset(
    client: &reqwest::Client,
    url: &Url,
    config: &IngestConfig,
    ledger: &DownloadLedger,
) -> Result<Option<PathBuf>, IngestError> {
    if !ledger.claim(url.as_str()) {
        debug!(url = %url, "asset already claimed, skipping download");
        return Ok(None);
    }

    tokio::fs::create_dir_all(&config.workspace_dir)
        .await
        .map_err(|source| IngestError::WorkspaceIo {
            path: config.workspace_dir.clone(),
            source,
        })?;

    let response = client
        .get(url.clone())
        .timeout(Duration::from_secs(config.download_timeout_secs))
        .send()
        .await
        .map_err(|e| IngestError::DownloadFailed {
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

    let dest = config.workspace_dir.join(asset_filename(url));
    let mut file = tokio::fs::File::create(&dest)
        .await
        .map_err(|source| IngestError::WorkspaceIo {
            path: dest.clone(),
            source,
        })?;

    let mut body = response.bytes_stream();
    while let Some(piece) = body.next().await {
        let bytes = piece.map_err(|e| IngestError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        file.write_all(&bytes)
            .await
            .map_err(|source| IngestError::WorkspaceIo {
                path: dest.clone(),
                source,
            })?;
    }
    file.flush()
        .await
        .map_err(|source| IngestError::WorkspaceIo {
            path: dest.clone(),
            source,
        })?;

    ledger.mark_completed();
    debug!(url = %url, dest = %dest.display(), "asset downloaded");
    Ok(Some(dest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_basename_different_urls_get_distinct_names() {
        let a = Url::parse("https://site.test/a/logo.png").unwrap();
        let b = Url::parse("https://site.test/b/logo.png").unwrap();
        let name_a = asset_filename(&a);
        let name_b = asset_filename(&b);
        assert_ne!(name_a, name_b);
        assert!(name_a.ends_with("_logo.png"));
        assert!(name_b.ends_with("_logo.png"));
    }

    #[test]
    fn filename_is_stable_for_one_url() {
        let url = Url::parse("https://site.test/doc.pdf").unwrap();
        assert_eq!(asset_filename(&url), asset_filename(&url));
    }

    #[test]
    fn awkward_segments_are_sanitized() {
        let url = Url::parse("https://site.test/files/na%20me%3F.pdf").unwrap();
        let name = asset_filename(&url);
        assert!(
            name.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        );
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn url_without_path_segment_falls_back() {
        let url = Url::parse("https://site.test/").unwrap();
        assert!(asset_filename(&url).ends_with("_asset"));
    }

    #[tokio::test]
    async fn claimed_url_is_not_fetched_again() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let scratch = tempfile::tempdir().unwrap();
        let config = IngestConfig::builder()
            .workspace_dir(scratch.path().join("ws"))
            .build()
            .unwrap();
        let client = crate::pipeline::fetch::build_http_client(&config).unwrap();
        let ledger = DownloadLedger::new();
        let url = Url::parse(&format!("{}/file.png", server.uri())).unwrap();

        let first = fetch_asset(&client, &url, &config, &ledger).await.unwrap();
        assert!(first.is_some());
        let second = fetch_asset(&client, &url, &config, &ledger).await.unwrap();
        assert!(second.is_none());
        assert_eq!(ledger.completed(), 1, "the skip is not a second download");
    }

    #[tokio::test]
    async fn failed_download_still_consumes_the_claim() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let scratch = tempfile::tempdir().unwrap();
        let config = IngestConfig::builder()
            .workspace_dir(scratch.path().join("ws"))
            .build()
            .unwrap();
        let client = crate::pipeline::fetch::build_http_client(&config).unwrap();
        let ledger = DownloadLedger::new();
        let url = Url::parse(&format!("{}/broken.pdf", server.uri())).unwrap();

        let err = fetch_asset(&client, &url, &config, &ledger).await.unwrap_err();
        assert!(matches!(err, IngestError::HttpStatus { status: 500, .. }));
        assert_eq!(ledger.completed(), 0, "a failed transfer is not a download");
        // Second encounter is a skip, not a retry.
        let second = fetch_asset(&client, &url, &config, &ledger).await.unwrap();
        assert!(second.is_none());
    }
}
