#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

//! Minimal chat backend.
//!
//! Users register and log in over HTTP, receive a signed session token, and
//! post or list chat messages. Every API request passes through an
//! instrumentation layer that feeds Prometheus request counters and
//! latency histograms.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod observability;
pub mod store;

pub use config::Config;
pub use error::ApiError;
