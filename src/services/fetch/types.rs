use reqwest::{RequestBuilder, StatusCode};
use std::fmt;
use std::sync::Arc;

/// Hook applied to every request before it is sent (auth headers, query params, ...)
pub type RequestMutator = Arc<dyn Fn(RequestBuilder) -> RequestBuilder + Send + Sync>;

/// A single GET to perform
#[derive(Clone)]
pub struct FetchSpec {
    pub url: String,
    pub mutator: Option<RequestMutator>,
    pub expected_status: Option<StatusCode>,
}

impl FetchSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mutator: None,
            expected_status: None,
        }
    }

    pub fn with_mutator<F>(mut self, mutator: F) -> Self
    where
        F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync + 'static,
    {
        self.mutator = Some(Arc::new(mutator));
        self
    }

    pub fn with_shared_mutator(mut self, mutator: Option<RequestMutator>) -> Self {
        self.mutator = mutator;
        self
    }

    pub fn expect_status(mut self, status: StatusCode) -> Self {
        self.expected_status = Some(status);
        self
    }

    /// Returns the mismatching status, if any
    pub(crate) fn status_mismatch(&self, status: StatusCode) -> Option<StatusCode> {
        match self.expected_status {
            Some(expected) if expected != status => Some(expected),
            _ => None,
        }
    }
}

impl fmt::Debug for FetchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchSpec")
            .field("url", &self.url)
            .field("mutator", &self.mutator.is_some())
            .field("expected_status", &self.expected_status)
            .finish()
    }
}

/// A fan-out of GETs over a bounded worker pool
#[derive(Debug, Clone)]
pub struct BatchSpec {
    pub requests: Vec<FetchSpec>,
    /// Number of concurrent workers
    pub concurrency: usize,
    /// Global pacing cap, 0 = unlimited
    pub rps: u32,
}

impl BatchSpec {
    pub fn new(requests: Vec<FetchSpec>) -> Self {
        Self {
            requests,
            concurrency: default_concurrency(),
            rps: 0,
        }
    }

    /// Same mutator and expected status for every URL
    pub fn from_urls<I, S>(
        urls: I,
        mutator: Option<RequestMutator>,
        expected_status: Option<StatusCode>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requests = urls
            .into_iter()
            .map(|url| FetchSpec {
                url: url.into(),
                mutator: mutator.clone(),
                expected_status,
            })
            .collect();
        Self::new(requests)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_rps(mut self, rps: u32) -> Self {
        self.rps = rps;
        self
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.concurrency.max(1)
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to build request for {url}: {source}")]
    RequestBuild {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected status {status} from {url} (expected {expected})")]
    StatusMismatch {
        url: String,
        status: StatusCode,
        expected: StatusCode,
    },
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Batch incomplete: received {received} of {requested} responses")]
    ShortBatch { requested: usize, received: usize },
}
