//! Request metrics.
//!
//! Two request series, both labelled `method` and `status`:
//! - `http_requests_total`: counter
//! - `http_duration_seconds`: histogram, default Prometheus buckets
//!
//! Plus two process gauges:
//! - `app_start_time_seconds`: Unix time the sink was created
//! - `app_memory_usage_bytes`: resident memory, refreshed by
//!   [`super::process::run_memory_sampler`]
//!
//! The Prometheus sink owns its own registry rather than using the process
//! default, so independent sinks never share counts.

use prometheus::{
    Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    DEFAULT_BUCKETS,
};
use std::time::Duration;

/// Content type of the text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const LABELS: &[&str] = &["method", "status"];

/// Destination for request outcomes. Implementations must tolerate
/// concurrent calls from many requests.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, method: &str, status: u16);

    fn observe_duration(&self, method: &str, status: u16, seconds: f64);
}

/// What happened to one request. Produced once, consumed immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub method: String,
    pub status: u16,
    pub duration: Duration,
}

impl RequestOutcome {
    pub fn record(&self, sink: &dyn MetricsSink) {
        sink.increment(&self.method, self.status);
        sink.observe_duration(&self.method, self.status, self.duration.as_secs_f64());
    }
}

pub struct PrometheusSink {
    registry: Registry,
    requests: IntCounterVec,
    durations: HistogramVec,
    start_time: Gauge,
    memory_usage: IntGauge,
}

impl PrometheusSink {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests."),
            LABELS,
        )?;
        let durations = HistogramVec::new(
            HistogramOpts::new(
                "http_duration_seconds",
                "Histogram of HTTP request durations in seconds.",
            )
            .buckets(DEFAULT_BUCKETS.to_vec()),
            LABELS,
        )?;

        let start_time = Gauge::new(
            "app_start_time_seconds",
            "App start time in seconds since Unix epoch",
        )?;
        start_time.set(chrono::Utc::now().timestamp_millis() as f64 / 1_000.0);
        let memory_usage =
            IntGauge::new("app_memory_usage_bytes", "Resident memory size in bytes")?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(durations.clone()))?;
        registry.register(Box::new(start_time.clone()))?;
        registry.register(Box::new(memory_usage.clone()))?;

        Ok(Self {
            registry,
            requests,
            durations,
            start_time,
            memory_usage,
        })
    }

    pub fn start_time_seconds(&self) -> f64 {
        self.start_time.get()
    }

    pub fn set_memory_usage(&self, bytes: u64) {
        self.memory_usage.set(i64::try_from(bytes).unwrap_or(i64::MAX));
    }

    pub fn memory_usage(&self) -> i64 {
        self.memory_usage.get()
    }

    /// Text exposition of every registered series.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }

    pub fn request_count(&self, method: &str, status: u16) -> u64 {
        let status = status.to_string();
        self.requests
            .with_label_values(&[method, status.as_str()])
            .get()
    }

    pub fn duration_sample_count(&self, method: &str, status: u16) -> u64 {
        let status = status.to_string();
        self.durations
            .with_label_values(&[method, status.as_str()])
            .get_sample_count()
    }
}

impl MetricsSink for PrometheusSink {
    fn increment(&self, method: &str, status: u16) {
        let status = status.to_string();
        self.requests
            .with_label_values(&[method, status.as_str()])
            .inc();
    }

    fn observe_duration(&self, method: &str, status: u16, seconds: f64) {
        let status = status.to_string();
        self.durations
            .with_label_values(&[method, status.as_str()])
            .observe(seconds);
    }
}
