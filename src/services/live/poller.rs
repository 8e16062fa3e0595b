use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;

use crate::services::live::health::{HealthCounters, HealthState, HealthTransition};
use crate::services::live::model::ChangeSet;
use crate::services::live::source::LiveSource;
use crate::services::live::tracker::{ChangeTracker, EventFilter};
use crate::services::metrics::FeedMetrics;
use crate::services::notify::{Alert, Notifier};
use crate::services::publish::Publisher;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub error_threshold: u32,
    pub recovery_threshold: u32,
    pub channel: String,
    pub event: String,
    pub alert_from: String,
    pub alert_to: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            error_threshold: 10,
            recovery_threshold: 10,
            channel: "live-scores".to_string(),
            event: "score-update".to_string(),
            alert_from: String::new(),
            alert_to: String::new(),
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Snapshot fetch failed; `alerted` is set on the Healthy -> Degraded edge
    Failed { alerted: bool },
    /// Snapshot fetched; `changed` events found, `published` if the publish succeeded
    Polled { changed: usize, published: bool },
}

/// Timer-driven live poller.
///
/// Owns its change tracker and health counters outright; the only way to
/// drive it is `tick` on an owned value or `run`, which consumes it.
pub struct LivePoller {
    source: Arc<dyn LiveSource>,
    notifier: Arc<dyn Notifier>,
    publisher: Arc<dyn Publisher>,
    filter: EventFilter,
    config: PollerConfig,
    tracker: ChangeTracker,
    health: HealthCounters,
    metrics: Option<Arc<FeedMetrics>>,
}

impl LivePoller {
    pub fn new(
        source: Arc<dyn LiveSource>,
        notifier: Arc<dyn Notifier>,
        publisher: Arc<dyn Publisher>,
        filter: EventFilter,
        config: PollerConfig,
    ) -> Self {
        let health = HealthCounters::new(config.error_threshold, config.recovery_threshold);
        Self {
            source,
            notifier,
            publisher,
            filter,
            config,
            tracker: ChangeTracker::new(),
            health,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<FeedMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn health(&self) -> &HealthCounters {
        &self.health
    }

    pub fn tracked_events(&self) -> usize {
        self.tracker.tracked()
    }

    /// Run one poll: fetch, update health, diff, publish
    pub async fn tick(&mut self) -> TickOutcome {
        let snapshot = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let error_text = e.to_string();
                tracing::warn!(
                    "Live fetch failed ({} consecutive): {}",
                    self.health.consecutive_errors.saturating_add(1),
                    error_text
                );
                self.count_tick("failed");

                let alerted = self.health.record_failure() == Some(HealthTransition::Degraded);
                if alerted {
                    tracing::error!(
                        "Live feed degraded after {} consecutive failures",
                        self.health.consecutive_errors
                    );
                    self.send_alert(&error_text).await;
                }
                self.update_health_gauge();
                return TickOutcome::Failed { alerted };
            }
        };

        self.count_tick("ok");
        if self.health.record_success() == Some(HealthTransition::Recovered) {
            tracing::info!(
                "Live feed recovered after {} consecutive successes",
                self.health.consecutive_ok
            );
        }
        self.update_health_gauge();

        let changes = self.tracker.diff(snapshot.events, &self.filter);
        if changes.is_empty() {
            tracing::debug!("No live changes ({} tracked)", self.tracker.tracked());
            return TickOutcome::Polled { changed: 0, published: false };
        }

        let changed = changes.len();
        let published = self.publish(&changes).await;
        TickOutcome::Polled { changed, published }
    }

    /// Poll on every interval tick until `quit` fires (or its sender is dropped).
    ///
    /// Quit is only observed between ticks; an in-flight fetch or publish
    /// always finishes first. Returns the poller so its state can be inspected.
    pub async fn run(mut self, mut quit: oneshot::Receiver<()>) -> Self {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("Live poller started (interval {:?})", self.config.interval);

        loop {
            tokio::select! {
                biased;
                _ = &mut quit => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::info!("Live poller stopped");
        self
    }

    /// Start `run` on a background task
    pub fn spawn(self) -> PollerHandle {
        let (quit_tx, quit_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(quit_rx));
        PollerHandle { quit: quit_tx, task }
    }

    async fn send_alert(&self, last_error: &str) {
        let alert = Alert::upstream_down(
            &self.config.alert_from,
            &self.config.alert_to,
            self.config.error_threshold,
            last_error,
        );
        if let Some(metrics) = &self.metrics {
            metrics.alerts_total.inc();
        }
        if let Err(e) = self.notifier.notify(&alert).await {
            tracing::error!("Failed to send live feed alert: {}", e);
        }
    }

    async fn publish(&self, changes: &ChangeSet) -> bool {
        let payload = match serde_json::to_value(changes) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to serialize change set: {}", e);
                return false;
            }
        };

        match self
            .publisher
            .publish(&self.config.channel, &self.config.event, &payload)
            .await
        {
            Ok(()) => {
                tracing::info!("Published {} live changes to {}", changes.len(), self.config.channel);
                if let Some(metrics) = &self.metrics {
                    metrics.changes_published_total.inc_by(changes.len() as f64);
                }
                true
            }
            Err(e) => {
                tracing::warn!("Failed to publish live changes: {}", e);
                if let Some(metrics) = &self.metrics {
                    metrics.publish_failures_total.inc();
                }
                false
            }
        }
    }

    fn count_tick(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.poll_ticks_total.with_label_values(&[outcome]).inc();
        }
    }

    fn update_health_gauge(&self) {
        if let Some(metrics) = &self.metrics {
            let value = match self.health.state {
                HealthState::Healthy => 0.0,
                HealthState::Degraded => 1.0,
            };
            metrics.health_state.set(value);
        }
    }
}

/// Handle to a spawned poller
pub struct PollerHandle {
    quit: oneshot::Sender<()>,
    task: JoinHandle<LivePoller>,
}

impl PollerHandle {
    /// Ask the poller to stop and wait for its current tick to finish
    pub async fn shutdown(self) -> Result<LivePoller, JoinError> {
        // Err only means the loop already exited
        let _ = self.quit.send(());
        self.task.await
    }
}
