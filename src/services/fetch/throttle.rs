use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::sync::Arc;
use std::time::Duration;

pub type PacingLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Spacing between releases for a global cap of `rps × workers` requests/second.
/// `None` when unlimited.
pub fn pacing_period(rps: u32, workers: usize) -> Option<Duration> {
    if rps == 0 {
        return None;
    }
    let per_second = u64::from(rps).saturating_mul(workers.max(1) as u64);
    Some(Duration::from_nanos((1_000_000_000 / per_second).max(1)))
}

/// Burst of 1, so releases are never closer than `period`
pub fn create_pacing_limiter(period: Duration) -> Option<PacingLimiter> {
    Quota::with_period(period).map(RateLimiter::direct)
}

/// Single pacing gate shared by every worker in a batch.
///
/// Workers pass through it after taking a job and immediately before sending
/// it, so a release is only granted to a request that goes out right away.
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<PacingLimiter>,
    period: Duration,
}

impl Throttle {
    /// `None` when `rps` is 0 (unlimited)
    pub fn new(rps: u32, workers: usize) -> Option<Self> {
        let period = pacing_period(rps, workers)?;
        let limiter = create_pacing_limiter(period)?;
        Some(Self {
            limiter: Arc::new(limiter),
            period,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next release slot
    pub async fn ready(&self) {
        self.limiter.until_ready().await;
    }
}
