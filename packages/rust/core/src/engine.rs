//! Per-URL acquisition: validate → classify → fetch (with substitution and
//! retries) → extract → post-process.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use webacquire_extract::{DomainPostProcessor, ExtractedContent};
use webacquire_fetch::{Capabilities, Fetcher, UrlClassifier, fallback_chain};
use webacquire_shared::{
    AcquireError, AppConfig, FetchError, FetchMethod, Metadata, ParsedDocument, Result,
    ScrapeMethod, ScrapedContent,
};

use crate::retry::{RetryPolicy, with_retry};

/// Content-acquisition engine.
///
/// Cheap to clone; configuration and the capability snapshot are shared
/// read-only between clones and concurrent calls.
#[derive(Debug, Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

#[derive(Debug)]
struct EngineInner {
    config: Arc<AppConfig>,
    caps: Capabilities,
    classifier: UrlClassifier,
    fetcher: Fetcher,
    post_processor: DomainPostProcessor,
    retry: RetryPolicy,
}

/// A fetched document together with the strategy that produced it.
struct Fetched {
    doc: ParsedDocument,
    requested: FetchMethod,
}

/// Why a run ended in an error record, and the strategy last attempted.
struct Failure {
    method: FetchMethod,
    error: AcquireError,
}

impl Engine {
    /// Build an engine, probing the environment for available backends.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let caps = Capabilities::detect(&config).await;
        Self::with_capabilities(config, caps)
    }

    /// Build an engine around a known capability snapshot.
    pub fn with_capabilities(config: AppConfig, caps: Capabilities) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let classifier = UrlClassifier::from_config(&config)?;
        let post_processor = DomainPostProcessor::new(config.domains.government_patterns()?);

        Ok(Self {
            inner: Arc::new(EngineInner {
                fetcher: Fetcher::new(Arc::clone(&config), &caps),
                retry: RetryPolicy::from(&config.retry),
                config,
                caps,
                classifier,
                post_processor,
            }),
        })
    }

    /// New engine with the same configuration and a fresh capability probe.
    pub async fn refresh_capabilities(&self) -> Result<Self> {
        Self::new(self.config().clone()).await
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.inner.caps
    }

    /// Acquire one URL. Never fails: every problem becomes an error record.
    #[instrument(skip_all, fields(url = %url, method = %method))]
    pub async fn scrape_url(&self, url: &str, method: ScrapeMethod) -> ScrapedContent {
        let start = Instant::now();
        info!("scrape started");

        match self.run(url, method).await {
            Ok((parts, metadata, used)) => {
                let elapsed = start.elapsed();
                info!(
                    method_used = %used,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "scrape succeeded"
                );
                ScrapedContent::success(url, parts, metadata, used, elapsed)
            }
            Err(failure) => {
                let elapsed = start.elapsed();
                error!(
                    method_used = %failure.method,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %failure.error,
                    "scrape failed"
                );
                ScrapedContent::failure(url, &failure.error, failure.method, elapsed)
            }
        }
    }

    async fn run(
        &self,
        raw: &str,
        method: ScrapeMethod,
    ) -> std::result::Result<(ExtractedContent, Metadata, FetchMethod), Failure> {
        let inner = &self.inner;
        let requested_hint = match method {
            ScrapeMethod::Fixed(m) => m,
            ScrapeMethod::Auto => FetchMethod::Static,
        };

        // Classifying
        let url = inner.classifier.validate(raw).map_err(|error| Failure {
            method: requested_hint,
            error,
        })?;
        let requested = match method {
            ScrapeMethod::Fixed(m) => m,
            ScrapeMethod::Auto => inner.classifier.classify_url(&url, &inner.caps),
        };
        debug!(%requested, "strategy selected");

        // Fetching
        let Fetched { doc, requested } = self.fetch_with_retry(&url, requested).await?;
        let used = doc.method;

        // Extracting
        let parts = webacquire_extract::extract(&doc).map_err(|error| Failure {
            method: used,
            error,
        })?;

        // PostProcessing
        let mut metadata = doc.metadata;
        inner.post_processor.apply(&url, &parts.content, &mut metadata);
        metadata.insert("method".into(), json!(used.as_str()));
        if used != requested {
            metadata.insert("substituted_from".into(), json!(requested.as_str()));
        }

        Ok((parts, metadata, used))
    }

    /// Walk the fallback chain under the retry policy.
    async fn fetch_with_retry(
        &self,
        url: &Url,
        requested: FetchMethod,
    ) -> std::result::Result<Fetched, Failure> {
        let chain = fallback_chain(requested, &self.inner.caps);
        if chain.first() != Some(&requested) {
            info!(%requested, substitute = ?chain.first(), "strategy unavailable, substituting");
        }
        let last_tried = Mutex::new(chain.first().copied().unwrap_or(FetchMethod::Static));

        let result = with_retry(&self.inner.retry, |attempt| {
            self.attempt_chain(&chain, url, attempt, &last_tried)
        })
        .await;

        match result {
            Ok(doc) => Ok(Fetched { doc, requested }),
            Err(error) => Err(Failure {
                method: last_tried
                    .lock()
                    .map(|m| *m)
                    .unwrap_or(FetchMethod::Static),
                error,
            }),
        }
    }

    /// One attempt: the first strategy that can run decides the outcome;
    /// strategies whose backend turns out to be unusable hand over to the next.
    async fn attempt_chain(
        &self,
        chain: &[FetchMethod],
        url: &Url,
        attempt: u32,
        last_tried: &Mutex<FetchMethod>,
    ) -> Result<ParsedDocument> {
        let mut last_err = FetchError::unavailable("no fetch strategy available");

        for &method in chain {
            if let Ok(mut slot) = last_tried.lock() {
                *slot = method;
            }
            debug!(%method, attempt, "fetching");
            match self.inner.fetcher.fetch(method, url, attempt).await {
                Ok(doc) => return Ok(doc),
                Err(e) if e.is_unavailable() => {
                    warn!(%method, error = %e, "backend unavailable, trying next strategy");
                    last_err = e;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use webacquire_shared::Status;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Engine reaching loopback mock servers, with fast retries.
    fn test_engine(caps: Capabilities) -> Engine {
        let mut config = AppConfig::default();
        config.http.block_private_hosts = false;
        config.retry.base_delay_ms = 10;
        Engine::with_capabilities(config, caps).unwrap()
    }

    #[tokio::test]
    async fn invalid_url_is_error_record_without_network() {
        let engine = test_engine(Capabilities::static_only());
        let record = engine.scrape_url("not a url", ScrapeMethod::Auto).await;

        assert_eq!(record.status, Status::Error);
        assert_eq!(record.title, "Error");
        assert!(record.content.starts_with("Scraping failed: invalid URL"));
        assert!(record.images.is_empty() && record.links.is_empty() && record.pdfs.is_empty());
        assert!(record.processing_time < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn private_hosts_blocked_by_default() {
        let engine = Engine::with_capabilities(AppConfig::default(), Capabilities::static_only())
            .unwrap();
        let record = engine
            .scrape_url("http://127.0.0.1:9/", ScrapeMethod::Auto)
            .await;
        assert_eq!(record.status, Status::Error);
        assert!(record.content.contains("not allowed"));
    }

    #[tokio::test]
    async fn static_page_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(
                        r#"<html><title>Policy</title><body><img src="/a.png"><a href="doc.pdf">doc</a></body></html>"#,
                    ),
            )
            .mount(&server)
            .await;

        let engine = test_engine(Capabilities::static_only());
        let url = format!("{}/", server.uri());
        let record = engine.scrape_url(&url, ScrapeMethod::Auto).await;

        assert_eq!(record.status, Status::Success);
        assert_eq!(record.method_used, FetchMethod::Static);
        assert_eq!(record.title, "Policy");
        assert_eq!(record.images, vec![format!("{}/a.png", server.uri())]);
        assert_eq!(record.pdfs, vec![format!("{}/doc.pdf", server.uri())]);
        assert_eq!(record.metadata["method"], "static");
        assert_eq!(record.metadata["status_code"], 200);
        assert!(record.metadata.get("substituted_from").is_none());
        assert!(record.metadata.get("source_type").is_none());
    }

    #[tokio::test]
    async fn unavailable_engines_substitute_static() {
        let server = MockServer::start().await;
        Mock::given(path("/rendered"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Notice</h1>"))
            .mount(&server)
            .await;

        let engine = test_engine(Capabilities::static_only());
        let url = format!("{}/rendered", server.uri());
        let record = engine
            .scrape_url(&url, ScrapeMethod::Fixed(FetchMethod::DynamicB))
            .await;

        assert_eq!(record.status, Status::Success);
        assert_eq!(record.method_used, FetchMethod::Static);
        assert_eq!(record.title, "Notice");
        assert_eq!(record.metadata["substituted_from"], "dynamic_b");
    }

    #[tokio::test]
    async fn runtime_unavailable_engine_hands_over() {
        let server = MockServer::start().await;
        Mock::given(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<title>Fallback</title>"))
            .mount(&server)
            .await;

        // The snapshot claims WebDriver works, but the endpoint is closed.
        let mut config = AppConfig::default();
        config.http.block_private_hosts = false;
        config.retry.base_delay_ms = 10;
        config.browser.primary = FetchMethod::DynamicB;
        config.browser.webdriver_url = "http://127.0.0.1:9".into();
        let mut caps = Capabilities::static_only();
        caps.dynamic_b = true;
        let engine = Engine::with_capabilities(config, caps).unwrap();

        let url = format!("{}/page", server.uri());
        let record = engine
            .scrape_url(&url, ScrapeMethod::Fixed(FetchMethod::DynamicB))
            .await;

        assert_eq!(record.status, Status::Success);
        assert_eq!(record.method_used, FetchMethod::Static);
        assert_eq!(record.metadata["substituted_from"], "dynamic_b");
    }

    #[tokio::test]
    async fn retries_then_reports_exhaustion() {
        let server = MockServer::start().await;
        Mock::given(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let engine = test_engine(Capabilities::static_only());
        let url = format!("{}/flaky", server.uri());
        let record = engine.scrape_url(&url, ScrapeMethod::Auto).await;

        assert_eq!(record.status, Status::Error);
        assert_eq!(record.method_used, FetchMethod::Static);
        assert!(record.content.contains("all 3 attempts failed"));
        assert!(record.content.contains("503"));
    }

    #[tokio::test]
    async fn empty_page_is_extraction_error() {
        let server = MockServer::start().await;
        Mock::given(path("/blank"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  "))
            .expect(1)
            .mount(&server)
            .await;

        let engine = test_engine(Capabilities::static_only());
        let record = engine
            .scrape_url(&format!("{}/blank", server.uri()), ScrapeMethod::Auto)
            .await;

        assert_eq!(record.status, Status::Error);
        assert!(record.content.contains("extraction error"));
    }

    #[tokio::test]
    async fn government_pages_get_legal_references() {
        let server = MockServer::start().await;
        Mock::given(path("/circular"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<title>Circular</title><p>Under Section 22 and Section 22 read with Rule 5.</p>",
            ))
            .mount(&server)
            .await;

        let mut config = AppConfig::default();
        config.http.block_private_hosts = false;
        // Treat the mock server as a government host.
        config.domains.government = vec![r"127\.0\.0\.1".into()];
        let engine = Engine::with_capabilities(config, Capabilities::static_only()).unwrap();

        let record = engine
            .scrape_url(&format!("{}/circular", server.uri()), ScrapeMethod::Auto)
            .await;

        assert_eq!(record.status, Status::Success);
        assert_eq!(record.metadata["source_type"], "government");
        assert_eq!(record.metadata["legal_references"], json!(["Rule 5", "Section 22"]));
        // No browser engine present, so the classifier settles on static.
        assert_eq!(record.method_used, FetchMethod::Static);
    }
}
