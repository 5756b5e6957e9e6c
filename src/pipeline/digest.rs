//! Structural text digests over parsed HTML.
//!
//! Two independent views of the same document:
//!
//! - [`section_digest`]: headings `h1`-`h3` become section titles, with the
//!   paragraphs and list items that follow them collected as bullet lines.
//! - [`faq_digest`]: any heading or bold run mentioning "FAQ" is captured
//!   together with a short window of following sibling paragraphs.
//!
//! Both work on an already-parsed [`Html`] tree. `Html` is not `Send`, so
//! callers parse once inside a synchronous scope, take these digests as
//! owned `String`s, and let the tree drop before the next await point.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

static SECTION_ELEMENTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, p, li").expect("static selector is valid"));

static FAQ_CANDIDATES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, b, strong").expect("static selector is valid"));

/// Elements whose text content is markup noise, never prose.
const NOISE_TAGS: [&str; 5] = ["script", "style", "noscript", "meta", "link"];

/// Visible text of an element, whitespace-normalized, with noise elements
/// skipped during descent.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(el, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for node in el.children() {
        match node.value() {
            Node::Text(t) => {
                out.push_str(&t.text);
                out.push(' ');
            }
            Node::Element(child) => {
                if NOISE_TAGS.contains(&child.name()) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(node) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

/// Heading-organized digest of the document body.
///
/// Walks `h1`-`h3`, `p` and `li` elements in document order. Each heading
/// opens a section; the paragraphs and list items after it become `- ` bullet
/// lines under that heading. Sections are joined by blank lines.
///
/// Text appearing before the first heading has no section to live in and is
/// dropped. A heading with no following content still yields a section of
/// just the heading line.
pub fn section_digest(doc: &Html) -> String {
    let mut sections: Vec<String> = Vec::new();
    let mut heading: Option<String> = None;
    let mut bullets: Vec<String> = Vec::new();

    for el in doc.select(&SECTION_ELEMENTS) {
        let text = element_text(el);
        if text.is_empty() {
            continue;
        }
        match el.value().name() {
            "h1" | "h2" | "h3" => {
                flush_section(&mut sections, heading.take(), &mut bullets);
                heading = Some(text);
            }
            _ => {
                if heading.is_some() {
                    bullets.push(text);
                }
            }
        }
    }
    flush_section(&mut sections, heading.take(), &mut bullets);

    sections.join("\n\n")
}

fn flush_section(sections: &mut Vec<String>, heading: Option<String>, bullets: &mut Vec<String>) {
    let Some(heading) = heading else {
        bullets.clear();
        return;
    };
    let mut block = heading;
    for bullet in bullets.drain(..) {
        block.push_str("\n- ");
        block.push_str(&bullet);
    }
    sections.push(block);
}

/// FAQ-labeled content: headings and bold runs whose text contains "faq"
/// (case-insensitive), each followed by up to `follow_limit` sibling
/// paragraphs or list items.
///
/// Fragments are concatenated in encounter order and never deduplicated;
/// overlapping matches may repeat content. Returns an empty string when the
/// document has no FAQ-labeled element.
pub fn faq_digest(doc: &Html, follow_limit: usize) -> String {
    let mut fragments: Vec<String> = Vec::new();

    for el in doc.select(&FAQ_CANDIDATES) {
        let own = element_text(el);
        if !own.to_lowercase().contains("faq") {
            continue;
        }
        fragments.push(own);

        // Walk following siblings; only p/li elements spend the budget,
        // anything between them is stepped over.
        let mut taken = 0;
        let mut node = el.next_sibling();
        while let Some(current) = node {
            if taken >= follow_limit {
                break;
            }
            if let Some(sibling) = ElementRef::wrap(current) {
                if matches!(sibling.value().name(), "p" | "li") {
                    taken += 1;
                    let text = element_text(sibling);
                    if !text.is_empty() {
                        fragments.push(text);
                    }
                }
            }
            node = current.next_sibling();
        }
    }

    fragments.join("\n")
}
