use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::sync::Arc;

use crate::services::fetch::{fetch, BatchFetcher, BatchSpec, FetchError, FetchSpec, RequestMutator};
use crate::services::live::model::{LiveEvent, LiveSnapshot};

/// Where the poller gets its snapshot from
#[async_trait]
pub trait LiveSource: Send + Sync {
    async fn snapshot(&self) -> Result<LiveSnapshot, FetchError>;
}

/// Reads one or more live-events endpoints over HTTP.
///
/// A single URL goes through the single fetcher; several (one per sport, say)
/// are fanned out with the batch fetcher and merged, so any missing feed fails
/// the whole snapshot.
pub struct HttpLiveSource {
    urls: Vec<String>,
    mutator: Option<RequestMutator>,
    concurrency: usize,
    rps: u32,
    client: Client,
    batch: BatchFetcher,
}

impl HttpLiveSource {
    pub fn new(client: Client, urls: Vec<String>) -> Self {
        Self {
            urls,
            mutator: None,
            concurrency: 4,
            rps: 0,
            batch: BatchFetcher::new(client.clone()),
            client,
        }
    }

    /// Sends `x-api-key` on every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let mutator: RequestMutator =
            Arc::new(move |req: RequestBuilder| req.header("x-api-key", api_key.as_str()));
        self.mutator = Some(mutator);
        self
    }

    pub fn with_batch(mut self, batch: BatchFetcher, concurrency: usize, rps: u32) -> Self {
        self.batch = batch;
        self.concurrency = concurrency;
        self.rps = rps;
        self
    }
}

#[async_trait]
impl LiveSource for HttpLiveSource {
    async fn snapshot(&self) -> Result<LiveSnapshot, FetchError> {
        if let [url] = self.urls.as_slice() {
            let spec = FetchSpec::new(url.as_str())
                .with_shared_mutator(self.mutator.clone())
                .expect_status(StatusCode::OK);
            return fetch(&self.client, &spec).await;
        }

        let spec = BatchSpec::from_urls(self.urls.iter().cloned(), self.mutator.clone(), Some(StatusCode::OK))
            .with_concurrency(self.concurrency)
            .with_rps(self.rps);
        let parts: Vec<LiveSnapshot> = self.batch.fetch(spec).await?;

        let events: Vec<LiveEvent> = parts.into_iter().flat_map(|p| p.events).collect();
        Ok(LiveSnapshot { events })
    }
}
