pub mod model;
pub mod tracker;
pub mod health;
pub mod source;
pub mod poller;

pub use model::{ChangeSet, EventId, EventStatus, EventTime, LiveEvent, LiveSnapshot, Score, Team, Tournament};
pub use tracker::{fingerprint, ChangeTracker, EventFilter};
pub use health::{HealthCounters, HealthState, HealthTransition};
pub use source::{HttpLiveSource, LiveSource};
pub use poller::{LivePoller, PollerConfig, PollerHandle, TickOutcome};
