//! Acquisition orchestration for webacquire.
//!
//! This crate ties classification, fetching, extraction and domain
//! post-processing into the public operations:
//! - [`Engine::scrape_url`]: one URL, never fails, always returns a record
//! - [`Engine::scrape_many`]: many URLs under a concurrency limit
//! - [`Engine::health_check`]: which strategies and tools this machine has

pub mod batch;
pub mod engine;
pub mod health;
pub mod retry;

pub use batch::run_bounded;
pub use engine::Engine;
pub use health::{HealthReport, StrategyStatus, ToolStatus};
pub use retry::{RetryPolicy, with_retry};

pub use webacquire_fetch::Capabilities;
pub use webacquire_shared::{AppConfig, FetchMethod, ScrapeMethod, ScrapedContent, Status};
