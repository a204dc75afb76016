//! Runtime capability detection.
//!
//! Which fetch backends exist depends on the machine: a Chrome executable for
//! the DevTools engine, a reachable WebDriver endpoint for the WebDriver
//! engine, poppler / MuPDF tools for PDF text. The result is an immutable
//! snapshot handed to the classifier and orchestrator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument};

use webacquire_shared::{AppConfig, FetchMethod};

/// Timeout for the WebDriver `/status` probe.
const WEBDRIVER_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for the outbound connectivity probe.
const NETWORK_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

/// Chrome executable names looked up on `PATH`.
const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Snapshot of the fetch backends present in this environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Chrome/Chromium executable used by the DevTools engine.
    pub chrome_executable: Option<PathBuf>,
    /// DevTools engine usable (feature compiled in and executable found).
    pub dynamic_a: bool,
    /// WebDriver engine usable (feature compiled in and endpoint answering).
    pub dynamic_b: bool,
    pub pdftotext: bool,
    pub mutool: bool,
    pub pdfinfo: bool,
}

impl Capabilities {
    /// Probe the environment.
    #[instrument(skip_all)]
    pub async fn detect(config: &AppConfig) -> Self {
        let chrome_executable = find_chrome(config.browser.chrome_executable.as_deref());
        let dynamic_a = cfg!(feature = "chromium") && chrome_executable.is_some();
        let dynamic_b =
            cfg!(feature = "webdriver") && probe_webdriver(&config.browser.webdriver_url).await;

        let caps = Self {
            chrome_executable,
            dynamic_a,
            dynamic_b,
            pdftotext: has_tool("pdftotext"),
            mutool: has_tool("mutool"),
            pdfinfo: has_tool("pdfinfo"),
        };

        info!(
            dynamic_a = caps.dynamic_a,
            dynamic_b = caps.dynamic_b,
            pdf = caps.is_available(FetchMethod::Pdf),
            "capabilities detected"
        );
        caps
    }

    /// Every backend present. Mostly useful for tests.
    pub fn all_available() -> Self {
        Self {
            chrome_executable: Some(PathBuf::from("chromium")),
            dynamic_a: true,
            dynamic_b: true,
            pdftotext: true,
            mutool: true,
            pdfinfo: true,
        }
    }

    /// Only the static strategy present.
    pub fn static_only() -> Self {
        Self {
            chrome_executable: None,
            dynamic_a: false,
            dynamic_b: false,
            pdftotext: false,
            mutool: false,
            pdfinfo: false,
        }
    }

    /// Copy of this snapshot with `method` marked unavailable.
    pub fn without(mut self, method: FetchMethod) -> Self {
        match method {
            FetchMethod::Static => {}
            FetchMethod::DynamicA => self.dynamic_a = false,
            FetchMethod::DynamicB => self.dynamic_b = false,
            FetchMethod::Pdf => {
                self.pdftotext = false;
                self.mutool = false;
            }
        }
        self
    }

    /// Whether `method` can run here. Static fetch always can.
    pub fn is_available(&self, method: FetchMethod) -> bool {
        match method {
            FetchMethod::Static => true,
            FetchMethod::DynamicA => self.dynamic_a,
            FetchMethod::DynamicB => self.dynamic_b,
            FetchMethod::Pdf => self.pdftotext || self.mutool,
        }
    }
}

/// Outbound connectivity check: a GET on `probe_url` answering 2xx.
#[instrument(skip_all, fields(probe_url = %probe_url))]
pub async fn probe_network(probe_url: &str) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(NETWORK_PROBE_TIMEOUT)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "failed to build probe client");
            return false;
        }
    };

    match client.get(probe_url).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            debug!(error = %e, "network probe failed");
            false
        }
    }
}

/// Whether a WebDriver server answers its `/status` endpoint.
async fn probe_webdriver(webdriver_url: &str) -> bool {
    let status_url = format!("{}/status", webdriver_url.trim_end_matches('/'));
    let client = match reqwest::Client::builder()
        .timeout(WEBDRIVER_PROBE_TIMEOUT)
        .build()
    {
        Ok(c) => c,
        Err(_) => return false,
    };

    match client.get(&status_url).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            debug!(%status_url, error = %e, "WebDriver endpoint not reachable");
            false
        }
    }
}

/// Locate a Chrome/Chromium executable: configured path, well-known paths, then `PATH`.
pub fn find_chrome(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        debug!(?path, "configured Chrome executable does not exist");
    }

    if let Some(path) = CHROME_PATHS.iter().map(Path::new).find(|p| p.exists()) {
        debug!(?path, "found Chrome");
        return Some(path.to_path_buf());
    }

    CHROME_COMMANDS
        .iter()
        .find_map(|cmd| which::which(cmd).ok())
        .inspect(|path| debug!(?path, "found Chrome in PATH"))
}

fn has_tool(name: &str) -> bool {
    which::which(name).is_ok()
}
