//! `dynamic_b`: headless Chrome through a WebDriver endpoint.

use std::time::Duration;

use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tracing::{debug, warn};

use webacquire_shared::FetchError;

use super::{RenderRequest, RenderedPage, TEARDOWN_TIMEOUT, chrome_args};

/// A WebDriver session closed on every exit path.
///
/// [`WebDriverSession::close`] ends the session in place; if the session is
/// dropped first (timeout, cancellation) the close is spawned onto the runtime.
struct WebDriverSession {
    client: Option<Client>,
}

impl WebDriverSession {
    /// Start a session. An endpoint that does not answer within `limit` counts
    /// as unavailable.
    async fn connect(
        webdriver_url: &str,
        user_agent: &str,
        limit: Duration,
    ) -> Result<Self, FetchError> {
        let mut args = vec!["--headless=new".to_string(), "--no-sandbox".to_string()];
        args.extend(chrome_args(user_agent));

        let mut caps = serde_json::Map::new();
        caps.insert("browserName".into(), json!("chrome"));
        caps.insert("goog:chromeOptions".into(), json!({ "args": args }));

        let mut builder = ClientBuilder::native();
        builder.capabilities(caps);
        let client = tokio::time::timeout(limit, builder.connect(webdriver_url))
            .await
            .map_err(|_| {
                FetchError::unavailable(format!(
                    "WebDriver at {webdriver_url} did not start a session within {}s",
                    limit.as_secs()
                ))
            })?
            .map_err(|e| {
                FetchError::unavailable(format!(
                    "failed to connect to WebDriver at {webdriver_url}: {e}"
                ))
            })?;
        debug!(webdriver_url, "WebDriver session started");

        Ok(Self {
            client: Some(client),
        })
    }

    fn client(&self) -> Result<&Client, FetchError> {
        self.client
            .as_ref()
            .ok_or_else(|| FetchError::failed("WebDriver session already closed"))
    }

    async fn close(mut self) {
        if let Some(client) = self.client.take() {
            match tokio::time::timeout(TEARDOWN_TIMEOUT, client.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "failed to close WebDriver session"),
                Err(_) => warn!("WebDriver session close timed out"),
            }
        }
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                let _ = tokio::time::timeout(TEARDOWN_TIMEOUT, client.close()).await;
            });
        }
    }
}

/// Open a session, render `request.url`, and always end the session.
pub(super) async fn render(request: RenderRequest<'_>) -> Result<RenderedPage, FetchError> {
    let limit = request.browser.navigation_timeout();
    let session =
        WebDriverSession::connect(&request.browser.webdriver_url, request.user_agent, limit)
            .await?;

    let outcome = tokio::time::timeout(limit, navigate(&session, request)).await;
    session.close().await;

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
    session: &WebDriverSession,
    request: RenderRequest<'_>,
) -> Result<RenderedPage, FetchError> {
    let url = request.url;
    let client = session.client()?;

    debug!(%url, "navigating");
    client
        .goto(url.as_str())
        .await
        .map_err(|e| FetchError::failed(format!("{url}: navigation failed: {e}")))?;

    // The body element exists once the document has been parsed.
    client
        .wait()
        .at_most(request.browser.navigation_timeout())
        .for_element(Locator::Css("body"))
        .await
        .map_err(|e| FetchError::failed(format!("{url}: page never became ready: {e}")))?;
    tokio::time::sleep(request.browser.settle_delay()).await;

    let html = client
        .source()
        .await
        .map_err(|e| FetchError::failed(format!("{url}: failed to read page source: {e}")))?;
    let title = client.title().await.ok().filter(|t| !t.is_empty());
    let final_url = client.current_url().await.ok().map(|u| u.to_string());

    Ok(RenderedPage {
        html,
        title,
        final_url,
    })
}
