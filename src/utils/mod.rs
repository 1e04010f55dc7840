//! # Utility Modules
//!
//! Supporting utilities shared by the relay and the binaries.
//!
//! ## Components
//! - **Logging**: tracing subscriber setup
//! - **Metrics**: per-relay atomic counters

pub mod logging;
pub mod metrics;

pub use metrics::{MetricsSnapshot, RelayMetrics};
