//! Core domain types: fetch strategies, fetched documents and result records.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use url::Url;

/// Free-form annotations attached to documents and results.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Title used for records of failed acquisitions.
pub const ERROR_TITLE: &str = "Error";

/// Title used when a document carries none.
pub const UNTITLED: &str = "Untitled";

// ---------------------------------------------------------------------------
// FetchMethod / ScrapeMethod
// ---------------------------------------------------------------------------

/// A concrete way of retrieving a URL's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    /// Plain HTTP GET and HTML parse, no script execution.
    Static,
    /// Headless Chrome driven over the DevTools protocol.
    DynamicA,
    /// Headless Chrome driven through a WebDriver endpoint.
    DynamicB,
    /// Binary download plus text extraction.
    Pdf,
}

impl FetchMethod {
    /// All strategies, in reporting order.
    pub const ALL: [FetchMethod; 4] = [
        FetchMethod::Static,
        FetchMethod::DynamicA,
        FetchMethod::DynamicB,
        FetchMethod::Pdf,
    ];

    /// Wire name of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::DynamicA => "dynamic_a",
            Self::DynamicB => "dynamic_b",
            Self::Pdf => "pdf",
        }
    }

    /// Whether this strategy renders pages in a headless browser.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::DynamicA | Self::DynamicB)
    }

    /// The other headless engine, for dynamic strategies.
    pub fn alternate_engine(&self) -> Option<FetchMethod> {
        match self {
            Self::DynamicA => Some(Self::DynamicB),
            Self::DynamicB => Some(Self::DynamicA),
            _ => None,
        }
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "dynamic_a" => Ok(Self::DynamicA),
            "dynamic_b" => Ok(Self::DynamicB),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!(
                "unknown fetch method '{other}' (expected static, dynamic_a, dynamic_b or pdf)"
            )),
        }
    }
}

/// Strategy requested by a caller: either deferred to the classifier or explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrapeMethod {
    #[default]
    Auto,
    Fixed(FetchMethod),
}

impl fmt::Display for ScrapeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fixed(method) => fmt::Display::fmt(method, f),
        }
    }
}

impl FromStr for ScrapeMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse::<FetchMethod>()
            .map(Self::Fixed)
            .map_err(|_| format!("unknown scrape method '{s}' (expected auto, static, dynamic_a, dynamic_b or pdf)"))
    }
}

impl From<FetchMethod> for ScrapeMethod {
    fn from(method: FetchMethod) -> Self {
        Self::Fixed(method)
    }
}

// ---------------------------------------------------------------------------
// ParsedDocument
// ---------------------------------------------------------------------------

/// Metadata read from a PDF's document information dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

/// A downloaded PDF together with the text one of the extractors produced.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    /// Raw bytes as downloaded.
    pub bytes: Vec<u8>,
    /// Extracted plain text (uncleaned).
    pub text: String,
    /// Document information, when it could be read.
    pub info: PdfInfo,
}

/// Payload of a fetched document.
#[derive(Debug, Clone)]
pub enum DocumentBody {
    /// Fully rendered (or static) HTML source.
    Html(String),
    /// PDF bytes plus extracted text.
    Pdf(PdfDocument),
}

/// Strategy-neutral handle returned by every fetch strategy.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// The requested URL; base for resolving relative references.
    pub url: Url,
    /// Where the fetch ended up after redirects or navigation.
    pub final_url: Option<Url>,
    /// Strategy that produced this document.
    pub method: FetchMethod,
    pub body: DocumentBody,
    /// Strategy-specific annotations (status code, content type, engine, ...).
    pub metadata: Metadata,
}

impl ParsedDocument {
    /// Build an HTML document.
    pub fn html(url: Url, method: FetchMethod, html: impl Into<String>) -> Self {
        Self {
            url,
            final_url: None,
            method,
            body: DocumentBody::Html(html.into()),
            metadata: Metadata::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScrapedContent
// ---------------------------------------------------------------------------

/// Outcome of one acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// The immutable output record for one acquisition attempt.
///
/// Construct through [`ScrapedContent::success`] or [`ScrapedContent::failure`];
/// a failure never carries images, links or PDFs.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedContent {
    /// Input URL exactly as submitted.
    pub url: String,
    pub title: String,
    /// Cleaned plain text, or the failure description for error records.
    pub content: String,
    pub images: Vec<String>,
    pub links: Vec<String>,
    pub pdfs: Vec<String>,
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
    pub status: Status,
    pub method_used: FetchMethod,
    /// Wall-clock time for the whole per-URL operation, retries included.
    #[serde(serialize_with = "serialize_secs")]
    pub processing_time: Duration,
}

/// Body fields of a successful acquisition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentParts {
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub links: Vec<String>,
    pub pdfs: Vec<String>,
}

impl ScrapedContent {
    /// Assemble a successful record.
    pub fn success(
        url: impl Into<String>,
        parts: ContentParts,
        metadata: Metadata,
        method_used: FetchMethod,
        processing_time: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            title: parts.title,
            content: parts.content,
            images: parts.images,
            links: parts.links,
            pdfs: parts.pdfs,
            metadata,
            timestamp: Utc::now(),
            status: Status::Success,
            method_used,
            processing_time,
        }
    }

    /// Assemble an error record whose content describes the failure.
    pub fn failure(
        url: impl Into<String>,
        message: impl fmt::Display,
        method_used: FetchMethod,
        processing_time: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            title: ERROR_TITLE.to_string(),
            content: format!("Scraping failed: {message}"),
            images: Vec::new(),
            links: Vec::new(),
            pdfs: Vec::new(),
            metadata: Metadata::new(),
            timestamp: Utc::now(),
            status: Status::Error,
            method_used,
            processing_time,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
