//! Government-source post-processing.
//!
//! Pages from known government hosts are tagged with `source_type` and get
//! the statute references found in their text listed under
//! `legal_references`.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde_json::json;
use tracing::debug;
use url::Url;

use webacquire_shared::{DomainPatterns, Metadata};

/// Statute reference patterns, matched case-insensitively.
pub const LEGAL_REFERENCE_PATTERNS: &[&str] = &[
    r"Act No\.?\s*\d+",
    r"Section\s+\d+",
    r"Rule\s+\d+",
    r"Regulation\s+\d+",
    r"Notification No\.?\s*\d+",
    r"Circular No\.?\s*\d+",
];

static LEGAL_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    LEGAL_REFERENCE_PATTERNS
        .iter()
        .map(|p| RegexBuilder::new(p).case_insensitive(true).build().unwrap())
        .collect()
});

/// Every legal reference in `text`, deduplicated and sorted.
///
/// Matches keep their original spelling, so `Section 3` and `section 3` are
/// distinct entries.
pub fn find_legal_references(text: &str) -> Vec<String> {
    LEGAL_RE
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| m.as_str().to_string()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Tags records that come from government hosts.
#[derive(Debug, Clone, Default)]
pub struct DomainPostProcessor {
    government: DomainPatterns,
}

impl DomainPostProcessor {
    pub fn new(government: DomainPatterns) -> Self {
        Self { government }
    }

    /// Add government metadata when `url` is a government host.
    /// Returns whether anything was added.
    pub fn apply(&self, url: &Url, content: &str, metadata: &mut Metadata) -> bool {
        if !self.government.matches_url(url) {
            return false;
        }

        let references = find_legal_references(content);
        debug!(%url, references = references.len(), "government source");
        metadata.insert("source_type".into(), json!("government"));
        metadata.insert("legal_references".into(), json!(references));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_and_dedupes_references() {
        let text = "Under Section 3 of Act No. 3 of 1956, read with Rule 12, Regulation 4, \
                    Circular No 7 and Notification No. 22. Section 3 again.";
        assert_eq!(
            find_legal_references(text),
            vec![
                "Act No. 3",
                "Circular No 7",
                "Notification No. 22",
                "Regulation 4",
                "Rule 12",
                "Section 3",
            ]
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(find_legal_references("see SECTION 12"), vec!["SECTION 12"]);
        assert!(find_legal_references("no statutes here").is_empty());
    }

    #[test]
    fn tags_government_hosts_only() {
        let processor = DomainPostProcessor::default();
        let mut meta = Metadata::new();

        let gov = Url::parse("https://www.ugc.gov.in/notices").unwrap();
        assert!(processor.apply(&gov, "Regulation 7 applies", &mut meta));
        assert_eq!(meta["source_type"], "government");
        assert_eq!(meta["legal_references"], json!(["Regulation 7"]));

        let mut other = Metadata::new();
        let plain = Url::parse("https://example.org/ugc.gov.in").unwrap();
        assert!(!processor.apply(&plain, "Regulation 7 applies", &mut other));
        assert!(other.is_empty());
    }

    #[test]
    fn references_key_is_present_even_when_empty() {
        let processor = DomainPostProcessor::default();
        let mut meta = Metadata::new();
        let gov = Url::parse("https://egazette.nic.in/").unwrap();
        processor.apply(&gov, "Weekly gazette", &mut meta);
        assert_eq!(meta["legal_references"], json!([]));
    }
}
