//! Telemetry: structured logging and Prometheus metrics.
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_core::telemetry::{init_telemetry, LoggingConfig, MetricsConfig};
//!
//! let handle = init_telemetry(&LoggingConfig::default(), &MetricsConfig::default())
//!     .expect("Failed to initialize telemetry");
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LoggingConfig, AUDIT_TARGET};
pub use metrics::{init_metrics, MetricsConfig, MetricsHandle};

use crate::error::Result;

/// Handle kept by the server for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct TelemetryHandle {
    /// Present when metrics are enabled
    pub metrics: Option<MetricsHandle>,
}

/// Initialize metrics, then logging. Call once at startup.
pub fn init_telemetry(logging: &LoggingConfig, metrics: &MetricsConfig) -> Result<TelemetryHandle> {
    let metrics = init_metrics(metrics)?;
    init_logging(logging)?;
    Ok(TelemetryHandle { metrics })
}
