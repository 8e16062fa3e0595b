pub mod types;
pub mod single;
pub mod throttle;
pub mod batch;

pub use types::*;
pub use single::fetch;
pub use batch::{fetch_batch, BatchFetcher};
