pub mod prometheus;
pub mod registry;
pub mod sink;

pub use prometheus::render_prometheus;
pub use registry::{MetricsRegistry, Summary};
pub use sink::{ErrorKind, MetricsSink, NoopMetrics, names, record_error};
