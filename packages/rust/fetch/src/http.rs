//! Static fetch: one HTTP GET, no script execution.
//!
//! Each call builds its own client so nothing is shared between concurrent
//! acquisitions; the client is dropped when the call returns.

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use webacquire_shared::{FetchError, FetchMethod, HttpConfig, Metadata, ParsedDocument};

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Accept header for HTML pages.
pub(crate) const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Accept header for PDF downloads.
pub(crate) const ACCEPT_PDF: &str = "application/pdf,*/*;q=0.8";

/// A fully read HTTP response.
#[derive(Debug)]
pub(crate) struct Downloaded {
    pub status: u16,
    pub content_type: String,
    pub final_url: Url,
    pub bytes: Vec<u8>,
}

impl Downloaded {
    /// Response facts shared by static and PDF metadata.
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("status_code".into(), json!(self.status));
        meta.insert("content_type".into(), json!(self.content_type));
        meta.insert("content_length".into(), json!(self.bytes.len()));
        meta.insert("final_url".into(), json!(self.final_url.as_str()));
        meta
    }
}

/// Build a disposable client for one request.
fn build_client(config: &HttpConfig, attempt: u32, accept: &'static str) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    Client::builder()
        .user_agent(config.user_agent_for(attempt))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(config.timeout())
        .build()
        .map_err(|e| FetchError::failed(format!("failed to build HTTP client: {e}")))
}

/// GET `url` and read the whole body. Non-2xx statuses are failures.
pub(crate) async fn download(
    config: &HttpConfig,
    url: &Url,
    attempt: u32,
    accept: &'static str,
) -> Result<Downloaded, FetchError> {
    let client = build_client(config, attempt, accept)?;

    let response = client.get(url.as_str()).send().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::failed(format!("{url}: timed out after {}s", config.timeout_secs))
        } else {
            FetchError::failed(format!("{url}: {e}"))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::failed(format!("{url}: HTTP {status}")));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let final_url = response.url().clone();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::failed(format!("{url}: body read failed: {e}")))?;

    Ok(Downloaded {
        status: status.as_u16(),
        content_type,
        final_url,
        bytes: bytes.to_vec(),
    })
}

/// Fetch a page with a plain GET and return its HTML.
#[instrument(skip_all, fields(url = %url, attempt = attempt))]
pub async fn fetch_static(
    config: &HttpConfig,
    url: &Url,
    attempt: u32,
) -> Result<ParsedDocument, FetchError> {
    debug!("static fetch");
    let downloaded = download(config, url, attempt, ACCEPT_HTML).await?;
    let metadata = downloaded.metadata();
    let html = String::from_utf8_lossy(&downloaded.bytes).into_owned();

    let mut doc = ParsedDocument::html(url.clone(), FetchMethod::Static, html);
    doc.final_url = Some(downloaded.final_url);
    doc.metadata = metadata;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use webacquire_shared::DocumentBody;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_html_with_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string("<html><title>Hi</title></html>"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let doc = fetch_static(&HttpConfig::default(), &url, 0).await.unwrap();

        assert_eq!(doc.method, FetchMethod::Static);
        assert_eq!(doc.metadata["status_code"], 200);
        assert_eq!(doc.metadata["content_type"], "text/html; charset=utf-8");
        match doc.body {
            DocumentBody::Html(html) => assert!(html.contains("<title>Hi</title>")),
            DocumentBody::Pdf(_) => panic!("expected HTML"),
        }
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetch_static(&HttpConfig::default(), &url, 0).await.unwrap_err();
        assert!(!err.is_unavailable());
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn user_agent_rotates_with_attempt() {
        let config = HttpConfig::default();
        let expected = config.user_agent_for(1).to_string();
        let server = MockServer::start().await;
        Mock::given(path("/ua"))
            .and(move |req: &wiremock::Request| {
                req.headers
                    .get("user-agent")
                    .is_some_and(|v| v.as_bytes() == expected.as_bytes())
            })
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/ua", server.uri())).unwrap();
        assert!(fetch_static(&config, &url, 0).await.is_err());
        assert!(fetch_static(&config, &url, 1).await.is_ok());
    }

    #[tokio::test]
    async fn connection_refused_is_fetch_error() {
        let url = Url::parse("http://127.0.0.1:9/closed").unwrap();
        let err = fetch_static(&HttpConfig::default(), &url, 0).await.unwrap_err();
        assert!(err.to_string().contains("127.0.0.1"));
    }
}
