//! Application configuration for webacquire.
//!
//! User config lives at `~/.webacquire/webacquire.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AcquireError, Result};
use crate::patterns::{DEFAULT_GOVERNMENT_DOMAINS, DomainPatterns};
use crate::types::FetchMethod;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "webacquire.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".webacquire";

/// Environment variable overriding the WebDriver endpoint.
pub const WEBDRIVER_URL_ENV: &str = "WEBDRIVER_URL";

// ---------------------------------------------------------------------------
// Config structs (matching webacquire.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP client settings shared by static and PDF fetches.
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Headless browser engines.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Batch limits.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Domain classification.
    #[serde(default)]
    pub domains: DomainsConfig,
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Overall per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agents rotated across attempts.
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// URL fetched by the connectivity probe.
    #[serde(default = "default_probe_url")]
    pub probe_url: String,

    /// Refuse URLs that resolve to loopback/private hosts.
    #[serde(default = "default_true")]
    pub block_private_hosts: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agents: default_user_agents(),
            probe_url: default_probe_url(),
            block_private_hosts: true,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// User agent for the given attempt index; rotates through the configured list.
    pub fn user_agent_for(&self, attempt: u32) -> &str {
        if self.user_agents.is_empty() {
            return FALLBACK_USER_AGENT;
        }
        &self.user_agents[attempt as usize % self.user_agents.len()]
    }
}

const FALLBACK_USER_AGENT: &str = concat!("webacquire/", env!("CARGO_PKG_VERSION"));

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
    ]
}
fn default_probe_url() -> String {
    "https://httpbin.org/get".into()
}
fn default_true() -> bool {
    true
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per URL, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before retry `i` is `base_delay_ms * 2^i`.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}

/// `[browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Preferred headless engine (`dynamic_a` or `dynamic_b`).
    #[serde(default = "default_primary")]
    pub primary: FetchMethod,

    /// Explicit Chrome/Chromium executable for the DevTools engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_executable: Option<PathBuf>,

    /// WebDriver endpoint for the WebDriver engine.
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Upper bound on one navigation, settle delay included.
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Extra wait after DOM readiness for asynchronous content.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            chrome_executable: None,
            webdriver_url: default_webdriver_url(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_primary() -> FetchMethod {
    FetchMethod::DynamicA
}
fn default_webdriver_url() -> String {
    "http://localhost:4444".into()
}
fn default_navigation_timeout_secs() -> u64 {
    30
}
fn default_settle_delay_ms() -> u64 {
    2000
}

/// `[batch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Default number of simultaneous acquisitions.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Largest batch a caller may submit.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

fn default_max_concurrent() -> usize {
    5
}
fn default_max_batch_size() -> usize {
    50
}

/// `[domains]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainsConfig {
    /// Host regexes of government sources.
    #[serde(default = "default_government")]
    pub government: Vec<String>,
}

impl Default for DomainsConfig {
    fn default() -> Self {
        Self {
            government: default_government(),
        }
    }
}

impl DomainsConfig {
    /// Compile the government host patterns.
    pub fn government_patterns(&self) -> Result<DomainPatterns> {
        DomainPatterns::new(&self.government)
    }
}

fn default_government() -> Vec<String> {
    DEFAULT_GOVERNMENT_DOMAINS.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Validation and environment overrides
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.browser.primary.is_dynamic() {
            return Err(AcquireError::config(format!(
                "browser.primary must be dynamic_a or dynamic_b, got {}",
                self.browser.primary
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(AcquireError::config("retry.max_attempts must be at least 1"));
        }
        if self.batch.max_batch_size == 0 {
            return Err(AcquireError::config("batch.max_batch_size must be at least 1"));
        }
        self.domains.government_patterns()?;
        Ok(())
    }

    /// Apply environment overrides (`WEBDRIVER_URL`).
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var(WEBDRIVER_URL_ENV) {
            if !url.is_empty() {
                tracing::debug!(%url, "WebDriver endpoint overridden from environment");
                self.browser.webdriver_url = url;
            }
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.webacquire/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AcquireError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.webacquire/webacquire.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AcquireError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        AcquireError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AcquireError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AcquireError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AcquireError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("webdriver_url"));
        assert!(toml_str.contains("dynamic_a"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.retry.max_attempts, 3);
        assert_eq!(parsed.batch.max_batch_size, 50);
        assert_eq!(parsed.domains.government.len(), 5);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[browser]
primary = "dynamic_b"
settle_delay_ms = 500

[domains]
government = ["gov\\.example"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.browser.primary, FetchMethod::DynamicB);
        assert_eq!(config.browser.settle_delay(), Duration::from_millis(500));
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
        assert!(config.domains.government_patterns().unwrap().matches_host("www.gov.example"));
        config.validate().expect("valid");
    }

    #[test]
    fn rejects_static_primary() {
        let mut config = AppConfig::default();
        config.browser.primary = FetchMethod::Static;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("browser.primary"));
    }

    #[test]
    fn user_agents_rotate_by_attempt() {
        let http = HttpConfig::default();
        assert_ne!(http.user_agent_for(0), http.user_agent_for(1));
        assert_eq!(http.user_agent_for(0), http.user_agent_for(3));

        let empty = HttpConfig {
            user_agents: Vec::new(),
            ..HttpConfig::default()
        };
        assert!(empty.user_agent_for(7).starts_with("webacquire/"));
    }
}
