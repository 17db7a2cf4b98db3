//! Process-wide `tracing` subscriber.

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "chatd=info,tower_http=info";

/// `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// fmt subscriber with RFC 3339 UTC timestamps.
pub fn build_subscriber<W>(
    filter: EnvFilter,
    writer: W,
) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(writer)
        .finish()
}

/// Install the stdout subscriber for the whole process.
pub fn init_tracing() -> Result<(), SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(build_subscriber(env_filter(), std::io::stdout))
}
