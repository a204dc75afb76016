//! Visible-text collection and normalisation.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

/// Subtrees that never contribute visible text.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header", "noscript", "template"];

/// Elements whose boundaries separate words.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "caption", "dd", "div", "dl", "dt",
    "figcaption", "figure", "form", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main",
    "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot", "th", "thead", "title",
    "tr", "ul",
];

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^\w\s.,!?;:\-()\[\]"']"#).unwrap());

/// Normalise extracted text: drop characters outside word characters,
/// whitespace and basic punctuation, collapse whitespace runs to one space,
/// then trim.
///
/// Applying it twice gives the same result as applying it once.
pub fn clean_text(text: &str) -> String {
    let kept = DISALLOWED_CHARS.replace_all(text, "");
    WHITESPACE.replace_all(&kept, " ").trim().to_string()
}

/// Collapse whitespace without dropping any characters (titles).
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// All text of the document outside skipped subtrees, block elements
/// separated by spaces. Not yet cleaned.
pub fn visible_text(doc: &Html) -> String {
    let mut out = String::new();
    collect(doc.root_element(), &mut out);
    out
}

fn collect(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_ELEMENTS.contains(&name) {
        return;
    }

    let is_block = BLOCK_ELEMENTS.contains(&name);
    if is_block {
        out.push(' ');
    }

    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect(child_el, out);
        }
    }

    if is_block {
        out.push(' ');
    }
}
