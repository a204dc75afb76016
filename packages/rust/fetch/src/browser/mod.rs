//! Headless browser fetch for script-rendered pages.
//!
//! Two interchangeable engines render the page in headless Chrome and return
//! the post-script DOM:
//!
//! - `dynamic_a`: Chrome driven directly over the DevTools protocol ([`chromiumoxide`])
//! - `dynamic_b`: Chrome driven through a WebDriver endpoint ([`fantoccini`])
//!
//! Every call owns a fresh browser session that is torn down on every exit
//! path, including timeouts and cancellation.

#[cfg(feature = "chromium")]
mod chromium;
#[cfg(feature = "webdriver")]
mod webdriver;

use std::path::Path;

use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use webacquire_shared::{BrowserConfig, FetchError, FetchMethod, HttpConfig, ParsedDocument};

/// Upper bound on closing a browser session once the page is captured.
#[cfg(any(feature = "chromium", feature = "webdriver"))]
const TEARDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// DOM snapshot taken after scripts settled.
#[derive(Debug, Clone)]
pub(crate) struct RenderedPage {
    pub html: String,
    pub title: Option<String>,
    pub final_url: Option<String>,
}

impl RenderedPage {
    fn into_document(self, url: &Url, method: FetchMethod, engine: &str) -> ParsedDocument {
        let content_length = self.html.len();
        let mut doc = ParsedDocument::html(url.clone(), method, self.html);
        doc.metadata.insert("engine".into(), json!(engine));
        doc.metadata
            .insert("page_title".into(), json!(self.title.unwrap_or_default()));
        doc.metadata.insert("content_length".into(), json!(content_length));
        if let Some(final_url) = self.final_url {
            doc.final_url = Url::parse(&final_url).ok();
            doc.metadata.insert("final_url".into(), json!(final_url));
        }
        doc
    }
}

/// Inputs shared by both engines.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderRequest<'a> {
    pub url: &'a Url,
    pub user_agent: &'a str,
    pub browser: &'a BrowserConfig,
}

/// Render `url` with the engine named by `method`.
///
/// Returns [`FetchError::Unavailable`] when the engine cannot start at all
/// (feature not compiled, no executable, endpoint down) so the caller can
/// substitute another strategy.
#[instrument(skip_all, fields(url = %url, method = %method, attempt = attempt))]
pub async fn fetch_dynamic(
    method: FetchMethod,
    http: &HttpConfig,
    browser: &BrowserConfig,
    chrome_executable: Option<&Path>,
    url: &Url,
    attempt: u32,
) -> Result<ParsedDocument, FetchError> {
    let request = RenderRequest {
        url,
        user_agent: http.user_agent_for(attempt),
        browser,
    };

    let (page, engine) = match method {
        FetchMethod::DynamicA => (render_chromium(request, chrome_executable).await?, "chromium"),
        FetchMethod::DynamicB => (render_webdriver(request).await?, "webdriver"),
        other => {
            return Err(FetchError::failed(format!(
                "{other} is not a browser strategy"
            )));
        }
    };

    debug!(engine, bytes = page.html.len(), "page rendered");
    Ok(page.into_document(url, method, engine))
}

#[cfg(feature = "chromium")]
async fn render_chromium(
    request: RenderRequest<'_>,
    chrome_executable: Option<&Path>,
) -> Result<RenderedPage, FetchError> {
    let executable = chrome_executable
        .ok_or_else(|| FetchError::unavailable("no Chrome/Chromium executable found"))?;
    chromium::render(request, executable).await
}

#[cfg(not(feature = "chromium"))]
async fn render_chromium(
    _request: RenderRequest<'_>,
    _chrome_executable: Option<&Path>,
) -> Result<RenderedPage, FetchError> {
    Err(FetchError::unavailable(
        "built without the `chromium` feature",
    ))
}

#[cfg(feature = "webdriver")]
async fn render_webdriver(request: RenderRequest<'_>) -> Result<RenderedPage, FetchError> {
    webdriver::render(request).await
}

#[cfg(not(feature = "webdriver"))]
async fn render_webdriver(_request: RenderRequest<'_>) -> Result<RenderedPage, FetchError> {
    Err(FetchError::unavailable(
        "built without the `webdriver` feature",
    ))
}

/// Chrome switches shared by both engines.
pub(crate) fn chrome_args(user_agent: &str) -> Vec<String> {
    vec![
        "--disable-gpu".into(),
        "--disable-dev-shm-usage".into(),
        "--disable-extensions".into(),
        "--no-first-run".into(),
        "--window-size=1920,1080".into(),
        format!("--user-agent={user_agent}"),
    ]
}
