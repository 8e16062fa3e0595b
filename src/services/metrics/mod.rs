pub mod registry;

pub use registry::FeedMetrics;
