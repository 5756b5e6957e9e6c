//! Link discovery: asset references and same-site navigation links.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

static ASSET_ELEMENTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a, iframe, embed").expect("static selector is valid"));

static IMAGE_ELEMENTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("static selector is valid"));

static ANCHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("static selector is valid"));

const PDF_EXTENSIONS: [&str; 1] = [".pdf"];
const IMAGE_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Everything worth following on one page, already resolved to absolute URLs.
#[derive(Debug, Default)]
pub struct DiscoveredLinks {
    /// PDF documents referenced by anchors, iframes or embeds.
    pub pdfs: Vec<Url>,
    /// Raster images referenced by `img` tags.
    pub images: Vec<Url>,
    /// Same-site navigation links, deduplicated, in document order.
    pub children: Vec<Url>,
}

/// Scan a parsed document for asset references and internal navigation
/// links, resolving every candidate against `base`.
///
/// Asset lists are not deduplicated here; the download ledger already
/// guarantees each URL is fetched at most once. Child links are
/// deduplicated because each one costs a full crawl.
pub fn discover_links(doc: &Html, base: &Url) -> DiscoveredLinks {
    let mut links = DiscoveredLinks::default();

    // Asset references. Anchors carry href; iframes and embeds carry src.
    for el in doc.select(&ASSET_ELEMENTS) {
        let Some(raw) = el.value().attr("href").or_else(|| el.value().attr("src")) else {
            continue;
        };
        if !has_extension(raw, &PDF_EXTENSIONS) {
            continue;
        }
        if let Ok(resolved) = base.join(raw) {
            links.pdfs.push(resolved);
        }
    }

    for el in doc.select(&IMAGE_ELEMENTS) {
        let Some(raw) = el.value().attr("src") else {
            continue;
        };
        if !has_extension(raw, &IMAGE_EXTENSIONS) {
            continue;
        }
        if let Ok(resolved) = base.join(raw) {
            links.images.push(resolved);
        }
    }

    // Navigation links: root-relative paths and absolute URLs on the same
    // origin. Everything else is off-site and out of scope for the crawl.
    let origin = base.origin().ascii_serialization();
    let mut seen: HashSet<String> = HashSet::new();

    for el in doc.select(&ANCHORS) {
        let Some(raw) = el.value().attr("href") else {
            continue;
        };
        if raw.is_empty()
            || raw.starts_with('#')
            || raw.starts_with("javascript:")
            || raw.starts_with("mailto:")
            || raw.starts_with("tel:")
        {
            continue;
        }
        if !(raw.starts_with('/') || raw.starts_with(&origin)) {
            continue;
        }
        let Ok(mut resolved) = base.join(raw) else {
            continue;
        };
        // Fragments address positions inside one page, not distinct pages.
        resolved.set_fragment(None);
        // Protocol-relative hrefs pass the starts-with('/') test but may
        // resolve off-origin; check the resolved URL, not the raw string.
        if resolved.origin().ascii_serialization() != origin {
            continue;
        }
        if seen.insert(resolved.as_str().to_string()) {
            links.children.push(resolved);
        }
    }

    links
}

fn has_extension(raw: &str, extensions: &[&str]) -> bool {
    let lower = raw.to_ascii_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext))
}
