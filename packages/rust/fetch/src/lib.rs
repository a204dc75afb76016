//! Fetch strategies, URL classification and capability detection.
//!
//! This crate provides:
//! - [`UrlClassifier`]: validates input URLs and picks a strategy for them
//! - [`Capabilities`]: snapshot of which backends exist on this machine
//! - [`Fetcher`]: runs one attempt with a given strategy
//!   (static GET, headless Chrome over CDP or WebDriver, PDF download + text)
//! - [`fallback_chain`]: substitution order when a backend is absent

pub mod browser;
pub mod capabilities;
pub mod classifier;
pub mod http;
pub mod pdf;
pub mod strategy;

pub use browser::fetch_dynamic;
pub use capabilities::{Capabilities, find_chrome, probe_network};
pub use classifier::UrlClassifier;
pub use http::fetch_static;
pub use pdf::{ExtractionFailure, ExtractorError, PdfExtractor, fetch_pdf, parse_pdfinfo};
pub use strategy::{Fetcher, fallback_chain};
