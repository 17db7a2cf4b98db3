//! Request observability: per-request outcome records, the sink they feed,
//! the axum middleware that produces them, process gauges and log setup.

pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod process;

pub use logging::{init_tracing, DEFAULT_LOG_FILTER};
pub use metrics::{MetricsSink, PrometheusSink, RequestOutcome};
pub use middleware::instrument;
pub use process::{run_memory_sampler, ProcessSampler, MEMORY_SAMPLE_INTERVAL};
