//! Prometheus metrics for authorization decisions.
//!
//! The counters themselves are emitted where decisions happen, through the
//! `metrics` facade. This module only installs the Prometheus recorder and
//! describes the series.

use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{Result, WardenError};

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    /// Labels added to every series
    #[serde(default)]
    pub global_labels: HashMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            global_labels: HashMap::new(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

/// Handle for rendering the current metrics snapshot.
#[derive(Clone)]
pub struct MetricsHandle {
    prometheus: PrometheusHandle,
}

impl std::fmt::Debug for MetricsHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsHandle").finish_non_exhaustive()
    }
}

impl MetricsHandle {
    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.prometheus.render()
    }
}

/// Install the global Prometheus recorder.
///
/// Returns `None` when metrics are disabled.
///
/// # Errors
///
/// Fails if another recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> Result<Option<MetricsHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let mut builder = PrometheusBuilder::new();
    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    let prometheus = builder
        .install_recorder()
        .map_err(|e| WardenError::configuration(format!("failed to install metrics recorder: {}", e)))?;

    register_metric_descriptions();

    Ok(Some(MetricsHandle { prometheus }))
}

fn register_metric_descriptions() {
    describe_counter!(
        "warden_authz_decisions_total",
        "Authorization decisions by outcome and denial reason"
    );
    describe_counter!(
        "warden_actor_resolution_total",
        "Actor resolution attempts by result"
    );
    describe_counter!("warden_errors_total", "Errors by code, category and severity");
}
