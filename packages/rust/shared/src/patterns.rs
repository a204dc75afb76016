//! URL pattern tables shared by the classifier, extractor and post-processor.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::error::{AcquireError, Result};

/// Patterns that mark a URL as pointing at a PDF resource.
const PDF_PATTERNS: &[&str] = &[r"\.pdf$", r"/pdf/", r"download.*\.pdf", r"document.*\.pdf"];

/// Government hosts whose pages need script execution and legal post-processing.
pub const DEFAULT_GOVERNMENT_DOMAINS: &[&str] = &[
    r"indiacode\.nic\.in",
    r"ugc\.gov\.in",
    r"aicte-india\.org",
    r"education\.gov\.in",
    r"egazette\.nic\.in",
];

static PDF_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PDF_PATTERNS
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .expect("valid regex")
        })
        .collect()
});

/// Whether `url` (absolute or a raw attribute value) looks like a PDF resource.
pub fn is_pdf_url(url: &str) -> bool {
    PDF_RE.iter().any(|re| re.is_match(url))
}

/// Compiled host patterns for a set of known domains.
#[derive(Debug, Clone)]
pub struct DomainPatterns {
    patterns: Vec<Regex>,
}

impl DomainPatterns {
    /// Compile case-insensitive host patterns.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        AcquireError::config(format!("invalid domain pattern '{}': {e}", p.as_ref()))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether `host` matches any pattern.
    pub fn matches_host(&self, host: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(host))
    }

    /// Whether the host of `url` matches any pattern. URLs without a host never match.
    pub fn matches_url(&self, url: &url::Url) -> bool {
        url.host_str().is_some_and(|h| self.matches_host(h))
    }
}

impl Default for DomainPatterns {
    fn default() -> Self {
        Self::new(DEFAULT_GOVERNMENT_DOMAINS).expect("default domain patterns compile")
    }
}
