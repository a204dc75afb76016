//! Content extraction from fetched documents.
//!
//! This crate provides:
//! - [`extract`]: turns a [`ParsedDocument`] into title, text, images, links and PDFs
//! - [`clean_text`]: the text normalisation applied to every record
//! - [`DomainPostProcessor`]: government-source tagging and legal references
//!
//! Everything here is pure: no I/O, and the same document always yields the
//! same result.

pub mod domain;
pub mod text;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use webacquire_shared::{
    AcquireError, DocumentBody, ParsedDocument, PdfDocument, Result, UNTITLED, is_pdf_url,
};

pub use domain::{DomainPostProcessor, LEGAL_REFERENCE_PATTERNS, find_legal_references};
pub use text::{clean_text, collapse_whitespace, visible_text};
pub use webacquire_shared::ContentParts as ExtractedContent;

/// Extract structured content from a fetched document.
///
/// Relative references are resolved against the requested URL.
pub fn extract(doc: &ParsedDocument) -> Result<ExtractedContent> {
    match &doc.body {
        DocumentBody::Html(html) => extract_html(html, &doc.url),
        DocumentBody::Pdf(pdf) => Ok(extract_pdf(pdf, &doc.url)),
    }
}

/// Extract content from an HTML page.
pub fn extract_html(html: &str, base: &Url) -> Result<ExtractedContent> {
    if html.trim().is_empty() {
        return Err(AcquireError::extraction(format!("{base}: empty document")));
    }

    let doc = Html::parse_document(html);
    let content = ExtractedContent {
        title: extract_title(&doc),
        content: clean_text(&visible_text(&doc)),
        images: resolved_attrs(&doc, "img[src]", "src", base),
        links: resolved_attrs(&doc, "a[href]", "href", base),
        pdfs: extract_pdf_links(&doc, base),
    };
    debug!(
        url = %base,
        chars = content.content.len(),
        images = content.images.len(),
        links = content.links.len(),
        pdfs = content.pdfs.len(),
        "extracted HTML"
    );
    Ok(content)
}

/// Extract content from a PDF whose text has already been pulled out.
pub fn extract_pdf(pdf: &PdfDocument, url: &Url) -> ExtractedContent {
    let title = pdf
        .info
        .title
        .as_deref()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
        .or_else(|| last_path_segment(url))
        .unwrap_or_else(|| UNTITLED.to_string());

    ExtractedContent {
        title,
        content: clean_text(&pdf.text),
        images: Vec::new(),
        links: Vec::new(),
        pdfs: vec![url.to_string()],
    }
}

/// First non-empty `<title>`, else first non-empty `<h1>`, else "Untitled".
fn extract_title(doc: &Html) -> String {
    ["title", "h1"]
        .into_iter()
        .find_map(|tag| first_text(doc, tag))
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn first_text(doc: &Html, tag: &str) -> Option<String> {
    let sel = Selector::parse(tag).unwrap();
    doc.select(&sel)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
}

/// Resolve one attribute of every element matching `selector`, in document order.
fn resolved_attrs(doc: &Html, selector: &str, attr: &str, base: &Url) -> Vec<String> {
    let sel = Selector::parse(selector).unwrap();
    doc.select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .filter_map(|raw| resolve(base, raw))
        .map(String::from)
        .collect()
}

/// Links and embedded documents that look like PDFs, in document order.
fn extract_pdf_links(doc: &Html, base: &Url) -> Vec<String> {
    let sel = Selector::parse("a[href], iframe[src], embed[src], object[data]").unwrap();
    doc.select(&sel)
        .filter_map(|el| {
            let raw = reference_attr(&el)?;
            let resolved = resolve(base, raw)?;
            (is_pdf_url(raw) || is_pdf_url(resolved.as_str())).then(|| resolved.to_string())
        })
        .collect()
}

fn reference_attr<'a>(el: &ElementRef<'a>) -> Option<&'a str> {
    let attr = match el.value().name() {
        "a" => "href",
        "object" => "data",
        _ => "src",
    };
    el.value().attr(attr)
}

fn resolve(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    base.join(raw).ok()
}

fn last_path_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use webacquire_shared::{FetchMethod, PdfInfo};

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn base() -> Url {
        Url::parse("https://www.education.gov.in/nep/about-nep").unwrap()
    }

    fn html_doc(html: &str) -> ParsedDocument {
        ParsedDocument::html(base(), FetchMethod::Static, html)
    }

    // -----------------------------------------------------------------------
    // HTML extraction
    // -----------------------------------------------------------------------

    #[test]
    fn policy_fixture_extracts_all_parts() {
        let content = extract(&html_doc(&load_fixture("policy.html"))).unwrap();

        assert_eq!(content.title, "National Education Policy 2020");
        assert!(content.content.contains("Notified under Section 3"));
        assert!(!content.content.contains("analytics"));
        assert!(!content.content.contains("About the Ministry"));
        assert!(!content.content.contains("Copyright"));

        assert_eq!(
            content.images,
            vec![
                "https://www.education.gov.in/images/emblem.png",
                "https://cdn.example.org/banner.jpg",
            ]
        );
        assert!(content.links.contains(&"https://www.education.gov.in/nep/downloads/guidelines.html".to_string()));
        assert_eq!(
            content.pdfs,
            vec![
                "https://www.education.gov.in/documents/NEP_Final_English.pdf",
                "https://www.ugc.gov.in/pdf/notice-2023",
                "https://www.education.gov.in/viewer/annexure.pdf",
            ]
        );
    }

    #[test]
    fn links_are_in_document_order() {
        let html = r#"<body><a href="/b">b</a><a href="https://x.org/a">a</a><a href="">none</a></body>"#;
        let content = extract(&html_doc(html)).unwrap();
        assert_eq!(
            content.links,
            vec!["https://www.education.gov.in/b", "https://x.org/a"]
        );
    }

    #[test]
    fn title_falls_back_to_h1_then_untitled() {
        let with_h1 = extract(&html_doc("<title>  </title><h1>Circular\n  2024</h1>")).unwrap();
        assert_eq!(with_h1.title, "Circular 2024");

        let bare = extract(&html_doc("<p>No headings here</p>")).unwrap();
        assert_eq!(bare.title, UNTITLED);
    }

    #[test]
    fn empty_html_is_extraction_error() {
        let err = extract(&html_doc("   \n ")).unwrap_err();
        assert!(matches!(err, AcquireError::Extraction(_)));
    }

    #[test]
    fn extraction_is_idempotent() {
        let doc = html_doc(&load_fixture("policy.html"));
        assert_eq!(extract(&doc).unwrap(), extract(&doc).unwrap());
    }

    #[test]
    fn minimal_policy_page() {
        let html = r#"<title>Policy</title><img src="/a.png"><a href="doc.pdf">doc</a>"#;
        let url = Url::parse("https://example.org/").unwrap();
        let content = extract(&ParsedDocument::html(url, FetchMethod::Static, html)).unwrap();
        assert_eq!(content.title, "Policy");
        assert_eq!(content.images, vec!["https://example.org/a.png"]);
        assert_eq!(content.pdfs, vec!["https://example.org/doc.pdf"]);
    }

    // -----------------------------------------------------------------------
    // PDF extraction
    // -----------------------------------------------------------------------

    fn pdf_doc(url: &str, title: Option<&str>) -> ParsedDocument {
        ParsedDocument {
            url: Url::parse(url).unwrap(),
            final_url: None,
            method: FetchMethod::Pdf,
            body: DocumentBody::Pdf(PdfDocument {
                bytes: Vec::new(),
                text: "Regulation  5\n\nThe Commission ©  hereby notifies".into(),
                info: PdfInfo {
                    title: title.map(String::from),
                    ..PdfInfo::default()
                },
            }),
            metadata: Default::default(),
        }
    }

    #[test]
    fn pdf_uses_metadata_title() {
        let content = extract(&pdf_doc("https://ugc.gov.in/pdf/regs.pdf", Some("UGC Regulations"))).unwrap();
        assert_eq!(content.title, "UGC Regulations");
        assert_eq!(content.content, "Regulation 5 The Commission hereby notifies");
        assert_eq!(content.pdfs, vec!["https://ugc.gov.in/pdf/regs.pdf"]);
        assert!(content.images.is_empty() && content.links.is_empty());
    }

    #[test]
    fn pdf_title_falls_back_to_file_name() {
        let content = extract(&pdf_doc("https://ugc.gov.in/pdf/regs.pdf", Some(" "))).unwrap();
        assert_eq!(content.title, "regs.pdf");

        let root = extract(&pdf_doc("https://ugc.gov.in/", None)).unwrap();
        assert_eq!(root.title, UNTITLED);
    }
}
