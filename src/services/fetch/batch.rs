use reqwest::{Client, Request, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::services::fetch::single::prepare;
use crate::services::fetch::throttle::Throttle;
use crate::services::fetch::{BatchSpec, FetchError, FetchSpec};
use crate::services::metrics::FeedMetrics;

/// A prepared request travelling through the pipeline
struct Job {
    url: String,
    expected_status: Option<StatusCode>,
    request: Request,
}

/// What a worker hands to the collector
struct RawResponse {
    url: String,
    expected_status: Option<StatusCode>,
    status: StatusCode,
    body: Vec<u8>,
}

type SharedJobs = Arc<Mutex<mpsc::Receiver<Job>>>;

/// Fan-out fetcher: producer -> worker pool (behind a shared throttle) -> collector
#[derive(Clone)]
pub struct BatchFetcher {
    client: Client,
    metrics: Option<Arc<FeedMetrics>>,
}

impl BatchFetcher {
    pub fn new(client: Client) -> Self {
        Self { client, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<FeedMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fetch every request in `spec` and decode each body into `T`.
    ///
    /// Status mismatches and transport errors drop the item and the call ends
    /// in `ShortBatch`; a decode error aborts the whole batch. Output order is
    /// unrelated to input order.
    pub async fn fetch<T: DeserializeOwned>(&self, spec: BatchSpec) -> Result<Vec<T>, FetchError> {
        let requested = spec.requests.len();
        if requested == 0 {
            return Ok(Vec::new());
        }

        let workers = spec.worker_count();
        let started = Instant::now();
        // Dropping the set aborts every stage, which is how a hard failure stops the batch
        let mut stages = JoinSet::new();

        let (job_tx, job_rx) = mpsc::channel::<Job>(workers);
        stages.spawn(produce(self.client.clone(), spec.requests, job_tx));

        let throttle = Throttle::new(spec.rps, workers);
        if let Some(throttle) = &throttle {
            tracing::debug!(
                "Batch of {} paced at one request per {:?}",
                requested,
                throttle.period()
            );
        }

        let jobs: SharedJobs = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<RawResponse>(workers);
        for worker_id in 0..workers {
            stages.spawn(work(
                worker_id,
                self.client.clone(),
                jobs.clone(),
                throttle.clone(),
                result_tx.clone(),
                self.metrics.clone(),
            ));
        }
        // Results close once the last worker drops its sender
        drop(result_tx);

        let mut decoded = Vec::with_capacity(requested);
        while let Some(raw) = result_rx.recv().await {
            if let Some(expected) = raw.expected_status.filter(|e| *e != raw.status) {
                tracing::warn!(
                    "Dropping response from {}: status {} (expected {})",
                    raw.url,
                    raw.status,
                    expected
                );
                self.record("status_mismatch");
                continue;
            }

            let item = serde_json::from_slice(&raw.body).map_err(|source| {
                self.record("decode_error");
                FetchError::Decode {
                    url: raw.url.clone(),
                    source,
                }
            })?;
            self.record("ok");
            decoded.push(item);
        }

        if let Some(metrics) = &self.metrics {
            metrics
                .batch_duration_seconds
                .observe(started.elapsed().as_secs_f64());
        }

        if decoded.len() < requested {
            return Err(FetchError::ShortBatch {
                requested,
                received: decoded.len(),
            });
        }

        tracing::debug!("Batch of {} completed in {:?}", requested, started.elapsed());
        Ok(decoded)
    }

    fn record(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.batch_requests_total.with_label_values(&[outcome]).inc();
        }
    }
}

/// Convenience wrapper over [`BatchFetcher`] without metrics
pub async fn fetch_batch<T: DeserializeOwned>(client: &Client, spec: BatchSpec) -> Result<Vec<T>, FetchError> {
    BatchFetcher::new(client.clone()).fetch(spec).await
}

async fn produce(client: Client, requests: Vec<FetchSpec>, jobs: mpsc::Sender<Job>) {
    for spec in requests {
        let request = match prepare(&client, &spec) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Skipping request: {}", e);
                continue;
            }
        };

        let job = Job {
            url: spec.url,
            expected_status: spec.expected_status,
            request,
        };
        if jobs.send(job).await.is_err() {
            break;
        }
    }
}

async fn work(
    worker_id: usize,
    client: Client,
    jobs: SharedJobs,
    throttle: Option<Throttle>,
    results: mpsc::Sender<RawResponse>,
    metrics: Option<Arc<FeedMetrics>>,
) {
    loop {
        let next = { jobs.lock().await.recv().await };
        let Some(job) = next else {
            break;
        };

        // Pace right before sending
        if let Some(throttle) = &throttle {
            throttle.ready().await;
        }
        tracing::debug!("Worker {} GET {}", worker_id, job.url);
        let response = match client.execute(job.request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Worker {} request to {} failed: {}", worker_id, job.url, e);
                if let Some(metrics) = &metrics {
                    metrics.batch_requests_total.with_label_values(&["transport_error"]).inc();
                }
                continue;
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body.to_vec(),
            Err(e) => {
                tracing::warn!("Worker {} failed reading body from {}: {}", worker_id, job.url, e);
                if let Some(metrics) = &metrics {
                    metrics.batch_requests_total.with_label_values(&["transport_error"]).inc();
                }
                continue;
            }
        };

        let raw = RawResponse {
            url: job.url,
            expected_status: job.expected_status,
            status,
            body,
        };
        if results.send(raw).await.is_err() {
            break;
        }
    }
    tracing::debug!("Worker {} drained", worker_id);
}
