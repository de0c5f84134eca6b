pub mod aggregator;
pub mod model;

pub use aggregator::{DEFAULT_QUEUE_CAPACITY, StatusAggregator};
pub use model::{STATUS_CAP, StatusEntry, StatusSnapshot};
