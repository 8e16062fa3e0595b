#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
}

/// State change produced by recording a poll result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    /// Healthy -> Degraded, the only edge that alerts
    Degraded,
    /// Degraded -> Healthy
    Recovered,
}

/// Consecutive error/success counters with hysteresis on both edges
#[derive(Debug, Clone)]
pub struct HealthCounters {
    pub consecutive_errors: u32,
    pub consecutive_ok: u32,
    pub state: HealthState,

    // Configuration
    pub error_threshold: u32,
    pub recovery_threshold: u32,
}

impl HealthCounters {
    pub fn new(error_threshold: u32, recovery_threshold: u32) -> Self {
        Self {
            consecutive_errors: 0,
            consecutive_ok: 0,
            state: HealthState::Healthy,
            error_threshold: error_threshold.max(1),
            recovery_threshold: recovery_threshold.max(1),
        }
    }

    pub fn in_alert(&self) -> bool {
        self.state == HealthState::Degraded
    }

    /// Record a failed poll
    pub fn record_failure(&mut self) -> Option<HealthTransition> {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.consecutive_ok = 0;

        if self.state == HealthState::Healthy && self.consecutive_errors >= self.error_threshold {
            self.state = HealthState::Degraded;
            return Some(HealthTransition::Degraded);
        }
        None
    }

    /// Record a successful poll
    pub fn record_success(&mut self) -> Option<HealthTransition> {
        self.consecutive_ok = self.consecutive_ok.saturating_add(1);
        self.consecutive_errors = 0;

        if self.state == HealthState::Degraded && self.consecutive_ok >= self.recovery_threshold {
            self.state = HealthState::Healthy;
            return Some(HealthTransition::Recovered);
        }
        None
    }
}

impl Default for HealthCounters {
    fn default() -> Self {
        Self::new(10, 10)
    }
}
