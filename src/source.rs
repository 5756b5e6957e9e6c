//! Source descriptors — the input units of an ingestion run.
//!
//! The JSON wire shape is a tagged object, one per source:
//!
//! ```json
//! [
//!   {"type": "website", "path": "https://docs.example.com", "dynamic": false, "depth": 2},
//!   {"type": "pdf",     "path": "reports/q3.pdf"},
//!   {"type": "image",   "path": "https://example.com/scan.png"}
//! ]
//! ```
//!
//! `dynamic` and `depth` apply to websites only; on pdf/image entries they
//! are ignored. `path` may be an HTTP/HTTPS URL or a filesystem path for
//! pdf/image sources; websites are always URLs.

use serde::{Deserialize, Serialize};

fn default_depth() -> u32 {
    1
}

/// One requested ingestion unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Source {
    /// A web page to crawl recursively up to `depth` hops.
    Website {
        /// Starting URL.
        path: String,
        /// Render with a headless browser before extraction. Applies to the
        /// top-level page only; discovered sub-links always fetch statically.
        #[serde(default)]
        dynamic: bool,
        /// Number of `crawl` invocations permitted along any path from this
        /// root. `1` extracts just the page itself; `0` is a no-op.
        #[serde(default = "default_depth")]
        depth: u32,
    },
    /// A PDF document (local path or URL) to rasterise and OCR.
    Pdf { path: String },
    /// A raster image (local path or URL) to OCR.
    Image { path: String },
}

impl Source {
    /// Website source with default flags (`dynamic: false`, `depth: 1`).
    pub fn website(path: impl Into<String>) -> Self {
        Self::Website {
            path: path.into(),
            dynamic: false,
            depth: 1,
        }
    }

    /// Website source with explicit rendering flag and depth budget.
    pub fn website_with(path: impl Into<String>, dynamic: bool, depth: u32) -> Self {
        Self::Website {
            path: path.into(),
            dynamic,
            depth,
        }
    }

    pub fn pdf(path: impl Into<String>) -> Self {
        Self::Pdf { path: path.into() }
    }

    pub fn image(path: impl Into<String>) -> Self {
        Self::Image { path: path.into() }
    }

    /// The URL or filesystem path this source points at.
    pub fn path(&self) -> &str {
        match self {
            Self::Website { path, .. } | Self::Pdf { path } | Self::Image { path } => path,
        }
    }

    /// Lowercase tag used in logs and messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Website { .. } => "website",
            Self::Pdf { .. } => "pdf",
            Self::Image { .. } => "image",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn website_json_round_trip() {
        let src = Source::website_with("https://a.test", true, 3);
        let json = serde_json::to_string(&src).unwrap();
        assert!(json.contains(r#""type":"website""#), "got: {json}");
        assert!(json.contains(r#""depth":3"#));
        let back: Source = serde_json::from_str(&json).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn website_defaults_apply() {
        let src: Source =
            serde_json::from_str(r#"{"type":"website","path":"https://a.test"}"#).unwrap();
        assert_eq!(src, Source::website("https://a.test"));
    }

    #[test]
    fn pdf_ignores_extra_fields() {
        // Manifests written for the website shape often carry dynamic/depth
        // on every entry; they must not break pdf/image parsing.
        let src: Source = serde_json::from_str(
            r#"{"type":"pdf","path":"doc.pdf","dynamic":false,"depth":2}"#,
        )
        .unwrap();
        assert_eq!(src, Source::pdf("doc.pdf"));
    }

    #[test]
    fn manifest_list_parses() {
        let manifest = r#"[
            {"type":"website","path":"https://a.test","depth":2},
            {"type":"image","path":"scan.png"}
        ]"#;
        let sources: Vec<Source> = serde_json::from_str(manifest).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].kind(), "website");
        assert_eq!(sources[1].kind(), "image");
    }

    #[test]
    fn unknown_type_rejected() {
        let err = serde_json::from_str::<Source>(r#"{"type":"video","path":"x"}"#);
        assert!(err.is_err());
    }
}
