pub mod fetch;
pub mod live;
pub mod metrics;
pub mod notify;
pub mod publish;
