//! HTTP surface for Warden.
//!
//! A small demo API behind the authorization layer. Every handler under
//! `/api` receives the [`AuthorizedRequest`](crate::rbac::AuthorizedRequest)
//! produced by the layer and applies its scope filter to the records it
//! returns.

mod handlers;

use axum::{routing::get, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::rbac::{AuthorizeLayer, ResourceOwner};
use crate::telemetry::MetricsHandle;

pub use handlers::health_check;

/// A stored threat model, the demo record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatModel {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub owner: ResourceOwner,
}

impl ThreatModel {
    pub fn new(id: impl Into<String>, title: impl Into<String>, owner: ResourceOwner) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            owner,
        }
    }
}

/// Application state shared across handlers.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub threat_models: Arc<Vec<ThreatModel>>,
    pub metrics: Option<MetricsHandle>,
}

impl AppState {
    pub fn new(threat_models: Vec<ThreatModel>) -> Self {
        Self {
            threat_models: Arc::new(threat_models),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Option<MetricsHandle>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Build the API router with the authorization layer applied to every route.
///
/// Public paths (by default `/health` and `/metrics`) pass through the layer
/// untouched.
///
/// # Example
///
/// ```rust,ignore
/// let layer = AuthorizeLayer::new(Arc::new(authorizer), Arc::new(resolver));
/// let app = build_router(AppState::default(), layer);
/// ```
pub fn build_router(state: AppState, authorize: AuthorizeLayer) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/api/me", get(handlers::whoami))
        .route("/api/admin/overview", get(handlers::admin_overview))
        .route("/api/business/overview", get(handlers::business_overview))
        .route("/api/threat-models", get(handlers::list_threat_models))
        .route("/api/threat-models/:id", get(handlers::get_threat_model))
        .layer(authorize)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API response wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}
