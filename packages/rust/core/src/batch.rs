//! Bounded-concurrency batch acquisition.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use webacquire_shared::{ScrapeMethod, ScrapedContent};

use crate::engine::Engine;

/// Run `f` over every item with at most `max_concurrent` futures in flight.
///
/// Every item gets its own task; a task waits for a semaphore permit before
/// its future is polled. Results arrive in completion order. Tasks that panic
/// or are cancelled are logged and left out of the output. A limit of 0 is
/// treated as 1.
pub async fn run_bounded<I, T, F, Fut>(items: I, max_concurrent: usize, f: F) -> Vec<T>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for item in items {
        let sem = Arc::clone(&semaphore);
        let fut = f(item);
        tasks.spawn(async move {
            let _permit = sem.acquire_owned().await.ok();
            fut.await
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(value) => results.push(value),
            Err(e) => error!(panicked = e.is_panic(), error = %e, "batch task failed, dropping its result"),
        }
    }
    results
}

impl Engine {
    /// Acquire many URLs (auto strategy) with bounded concurrency.
    ///
    /// Output order is completion order, not input order.
    #[instrument(skip_all, fields(urls = urls.len(), max_concurrent = max_concurrent))]
    pub async fn scrape_many(&self, urls: Vec<String>, max_concurrent: usize) -> Vec<ScrapedContent> {
        self.scrape_many_with(urls, ScrapeMethod::Auto, max_concurrent).await
    }

    /// Like [`Engine::scrape_many`] with one strategy forced for every URL.
    pub async fn scrape_many_with(
        &self,
        urls: Vec<String>,
        method: ScrapeMethod,
        max_concurrent: usize,
    ) -> Vec<ScrapedContent> {
        let total = urls.len();
        let engine = self.clone();
        let results = run_bounded(urls, max_concurrent, move |url: String| {
            let engine = engine.clone();
            async move { engine.scrape_url(&url, method).await }
        })
        .await;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(total, returned = results.len(), succeeded, "batch finished");
        results
    }
}
