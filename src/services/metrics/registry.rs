use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics for the fetch pipeline and the live poller
pub struct FeedMetrics {
    registry: Registry,

    // Poller
    pub poll_ticks_total: CounterVec,
    pub alerts_total: Counter,
    pub changes_published_total: Counter,
    pub publish_failures_total: Counter,
    pub health_state: Gauge,

    // Batch pipeline
    pub batch_requests_total: CounterVec,
    pub batch_duration_seconds: Histogram,
}

impl FeedMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let poll_ticks_total = CounterVec::new(
            Opts::new("poll_ticks_total", "Live poll ticks by outcome").namespace("livescore"),
            &["outcome"],
        )?;
        registry.register(Box::new(poll_ticks_total.clone()))?;

        let alerts_total = Counter::with_opts(
            Opts::new("alerts_total", "Upstream failure alerts sent").namespace("livescore"),
        )?;
        registry.register(Box::new(alerts_total.clone()))?;

        let changes_published_total = Counter::with_opts(
            Opts::new("changes_published_total", "Changed events published").namespace("livescore"),
        )?;
        registry.register(Box::new(changes_published_total.clone()))?;

        let publish_failures_total = Counter::with_opts(
            Opts::new("publish_failures_total", "Failed change-set publishes").namespace("livescore"),
        )?;
        registry.register(Box::new(publish_failures_total.clone()))?;

        let health_state = Gauge::with_opts(
            Opts::new("health_state", "Upstream health (0 = healthy, 1 = degraded)")
                .namespace("livescore"),
        )?;
        registry.register(Box::new(health_state.clone()))?;

        let batch_requests_total = CounterVec::new(
            Opts::new("batch_requests_total", "Batch fetch items by outcome").namespace("livescore"),
            &["outcome"],
        )?;
        registry.register(Box::new(batch_requests_total.clone()))?;

        let batch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("batch_duration_seconds", "Batch fetch duration")
                .namespace("livescore")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(batch_duration_seconds.clone()))?;

        Ok(Arc::new(Self {
            registry,
            poll_ticks_total,
            alerts_total,
            changes_published_total,
            publish_failures_total,
            health_state,
            batch_requests_total,
            batch_duration_seconds,
        }))
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
