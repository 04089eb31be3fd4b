//! Structured logging with JSON, pretty and compact formats.
//!
//! Authorization denials are emitted under the `warden::audit` target, so an
//! operator can route or filter them independently, e.g.
//! `level = "info,warden::audit=info,warden_core=warn"`.

use serde::Deserialize;
use std::collections::HashMap;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::error::{Result, WardenError};

/// Target used for authorization audit events.
pub const AUDIT_TARGET: &str = "warden::audit";

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Global filter directive (trace, debug, info, warn, error, or a full EnvFilter string)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Per-module log levels
    #[serde(default)]
    pub module_levels: HashMap<String, String>,

    /// Whether to include file/line information
    #[serde(default)]
    pub include_location: bool,

    /// Whether to include target (module path)
    #[serde(default = "default_include_target")]
    pub include_target: bool,

    /// Log span close events with their duration
    #[serde(default)]
    pub span_close_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            module_levels: HashMap::new(),
            include_location: false,
            include_target: default_include_target(),
            span_close_events: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for production/structured logging
    #[default]
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact single-line format
    Compact,
}

impl LoggingConfig {
    /// Build the filter from `level` plus every per-module override.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level).map_err(|e| {
            WardenError::configuration(format!("invalid log level {:?}: {}", self.level, e))
        })?;

        for (module, level) in &self.module_levels {
            let directive = format!("{}={}", module, level);
            filter = filter.add_directive(directive.parse().map_err(|e| {
                WardenError::configuration(format!("invalid log directive {:?}: {}", directive, e))
            })?);
        }

        Ok(filter)
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_close_events {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

fn default_log_level() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}

fn default_include_target() -> bool {
    true
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Fails on an unparsable filter or when a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(config.span_events())
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_target(config.include_target),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_span_events(config.span_events())
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_target(config.include_target),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_span_events(config.span_events())
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_target(config.include_target),
            )
            .try_init(),
    };

    installed.map_err(|e| WardenError::configuration(format!("logging already initialized: {}", e)))
}
