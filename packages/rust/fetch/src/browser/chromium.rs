//! `dynamic_a`: headless Chrome over the DevTools protocol.

use std::path::Path;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, BrowserConfig as LaunchConfig, Page};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use webacquire_shared::FetchError;

use super::{RenderRequest, RenderedPage, TEARDOWN_TIMEOUT, chrome_args};

/// Resolves once the DOM is parsed, or after 10s as a fallback.
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// One launched browser with its own throwaway profile.
///
/// Dropping the session aborts the CDP handler task; the `Browser` drop then
/// kills the Chrome process if [`ChromiumSession::shutdown`] never ran.
struct ChromiumSession {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    _profile: TempDir,
}

impl ChromiumSession {
    /// Start Chrome. A browser that is not up within `limit` counts as
    /// unavailable.
    async fn launch(
        executable: &Path,
        user_agent: &str,
        limit: Duration,
    ) -> Result<Self, FetchError> {
        let profile = tempfile::Builder::new()
            .prefix("webacquire-chrome-")
            .tempdir()
            .map_err(|e| FetchError::unavailable(format!("cannot create browser profile: {e}")))?;

        let mut builder = LaunchConfig::builder()
            .chrome_executable(executable)
            .user_data_dir(profile.path())
            .no_sandbox();
        for arg in chrome_args(user_agent) {
            builder = builder.arg(arg);
        }
        let config = builder
            .build()
            .map_err(|e| FetchError::unavailable(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = tokio::time::timeout(limit, Browser::launch(config))
            .await
            .map_err(|_| {
                FetchError::unavailable(format!(
                    "Chrome did not start within {}s",
                    limit.as_secs()
                ))
            })?
            .map_err(|e| FetchError::unavailable(format!("failed to launch Chrome: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Some(browser),
            handler,
            _profile: profile,
        })
    }

    fn browser(&self) -> Result<&Browser, FetchError> {
        self.browser
            .as_ref()
            .ok_or_else(|| FetchError::failed("browser session already closed"))
    }

    /// Close Chrome politely, giving up after [`TEARDOWN_TIMEOUT`]. The
    /// `Browser` drop kills a process that is still running.
    async fn shutdown(mut self) {
        if let Some(mut browser) = self.browser.take() {
            let closed = tokio::time::timeout(TEARDOWN_TIMEOUT, async {
                if let Err(e) = browser.close().await {
                    debug!(error = %e, "browser close failed");
                }
                if let Err(e) = browser.wait().await {
                    debug!(error = %e, "browser wait failed");
                }
            })
            .await;
            if closed.is_err() {
                warn!("browser close timed out, killing the process");
            }
        }
        self.handler.abort();
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Launch Chrome, render `request.url`, and always close the browser.
pub(super) async fn render(
    request: RenderRequest<'_>,
    executable: &Path,
) -> Result<RenderedPage, FetchError> {
    let limit = request.browser.navigation_timeout();
    let session = ChromiumSession::launch(executable, request.user_agent, limit).await?;

    let outcome = tokio::time::timeout(limit, navigate(&session, request)).await;
    session.shutdown().await;

    match outcome {
        Ok(result) => result,
        Err(_) => Err(FetchError::failed(format!(
            "{}: navigation timed out after {}s",
            request.url,
            limit.as_secs()
        ))),
    }
}

async fn navigate(
    session: &ChromiumSession,
    request: RenderRequest<'_>,
) -> Result<RenderedPage, FetchError> {
    let url = request.url;
    let nav_err = |e: chromiumoxide::error::CdpError| FetchError::failed(format!("{url}: {e}"));

    let page = session.browser()?.new_page("about:blank").await.map_err(nav_err)?;
    page.execute(SetUserAgentOverrideParams::new(request.user_agent.to_string()))
        .await
        .map_err(nav_err)?;

    debug!(%url, "navigating");
    let nav_params = NavigateParams::builder()
        .url(url.as_str())
        .build()
        .map_err(|e| FetchError::failed(format!("{url}: {e}")))?;
    page.execute(nav_params).await.map_err(nav_err)?;

    wait_until_ready(&page).await;
    tokio::time::sleep(request.browser.settle_delay()).await;

    let html = page.content().await.map_err(nav_err)?;
    let title = page.get_title().await.ok().flatten();
    let final_url = page.url().await.ok().flatten();

    if let Err(e) = page.close().await {
        debug!(error = %e, "page close failed");
    }

    Ok(RenderedPage {
        html,
        title,
        final_url,
    })
}

async fn wait_until_ready(page: &Page) {
    match page.evaluate(WAIT_FOR_READY_SCRIPT.to_string()).await {
        Ok(result) => {
            let state: String = result
                .into_value()
                .unwrap_or_else(|_| "unknown".to_string());
            debug!(%state, "page ready state");
        }
        Err(e) => warn!(error = %e, "could not check ready state"),
    }
}
