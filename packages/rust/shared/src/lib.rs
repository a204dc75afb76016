//! Shared types, error model, and configuration for webacquire.
//!
//! This crate is the foundation depended on by all other webacquire crates.
//! It provides:
//! - Error types ([`AcquireError`], [`FetchError`])
//! - Domain types ([`ScrapedContent`], [`ParsedDocument`], [`FetchMethod`])
//! - Configuration ([`AppConfig`], config loading)
//! - URL pattern tables ([`is_pdf_url`], [`DomainPatterns`])

pub mod config;
pub mod error;
pub mod patterns;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BatchConfig, BrowserConfig, DomainsConfig, HttpConfig, RetryConfig,
    WEBDRIVER_URL_ENV, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{AcquireError, FetchError, Result};
pub use patterns::{DEFAULT_GOVERNMENT_DOMAINS, DomainPatterns, is_pdf_url};
pub use types::{
    ContentParts, DocumentBody, ERROR_TITLE, FetchMethod, Metadata, ParsedDocument, PdfDocument,
    PdfInfo, ScrapeMethod, ScrapedContent, Status, UNTITLED,
};
