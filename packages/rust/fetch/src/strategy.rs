//! Strategy dispatch and fallback chains.

use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use webacquire_shared::{AppConfig, FetchError, FetchMethod, ParsedDocument};

use crate::capabilities::Capabilities;
use crate::{browser, http, pdf};

/// Ordered strategies to try for a requested method.
///
/// Entries whose backend is absent are left out; static fetch is always the
/// last resort.
pub fn fallback_chain(method: FetchMethod, caps: &Capabilities) -> Vec<FetchMethod> {
    let chain: &[FetchMethod] = match method {
        FetchMethod::DynamicA => &[FetchMethod::DynamicA, FetchMethod::DynamicB, FetchMethod::Static],
        FetchMethod::DynamicB => &[FetchMethod::DynamicB, FetchMethod::DynamicA, FetchMethod::Static],
        FetchMethod::Pdf => &[FetchMethod::Pdf, FetchMethod::Static],
        FetchMethod::Static => &[FetchMethod::Static],
    };
    chain
        .iter()
        .copied()
        .filter(|m| caps.is_available(*m))
        .collect()
}

/// Runs one fetch attempt with a given strategy.
///
/// Holds only immutable configuration; every call creates and disposes of
/// its own client or browser session.
#[derive(Debug, Clone)]
pub struct Fetcher {
    config: Arc<AppConfig>,
    chrome_executable: Option<PathBuf>,
}

impl Fetcher {
    pub fn new(config: Arc<AppConfig>, caps: &Capabilities) -> Self {
        Self {
            config,
            chrome_executable: caps.chrome_executable.clone(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Fetch `url` with `method`. `attempt` is the zero-based retry index.
    pub async fn fetch(
        &self,
        method: FetchMethod,
        url: &Url,
        attempt: u32,
    ) -> Result<ParsedDocument, FetchError> {
        match method {
            FetchMethod::Static => http::fetch_static(&self.config.http, url, attempt).await,
            FetchMethod::DynamicA | FetchMethod::DynamicB => {
                browser::fetch_dynamic(
                    method,
                    &self.config.http,
                    &self.config.browser,
                    self.chrome_executable.as_deref(),
                    url,
                    attempt,
                )
                .await
            }
            FetchMethod::Pdf => pdf::fetch_pdf(&self.config.http, url, attempt).await,
        }
    }
}
