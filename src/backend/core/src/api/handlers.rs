//! API request handlers.
//!
//! Handlers return `Result<impl IntoResponse, WardenError>` so failures map to
//! HTTP status codes through `WardenError`'s `IntoResponse` implementation.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use super::{ApiResponse, AppState, ThreatModel};
use crate::error::WardenError;
use crate::rbac::{Actor, AuthorizedRequest, ScopeFilter};

// ═══════════════════════════════════════════════════════════════════════════════
// Health & Metrics
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scope Echo
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct ScopeView {
    pub actor: Actor,
    pub scope: ScopeFilter,
    pub area: &'static str,
}

fn scope_view(request: AuthorizedRequest, area: &'static str) -> Json<ApiResponse<ScopeView>> {
    Json(ApiResponse::success(ScopeView {
        actor: request.actor,
        scope: request.scope,
        area,
    }))
}

pub async fn whoami(request: AuthorizedRequest) -> impl IntoResponse {
    scope_view(request, "self")
}

pub async fn admin_overview(request: AuthorizedRequest) -> impl IntoResponse {
    scope_view(request, "platform")
}

pub async fn business_overview(request: AuthorizedRequest) -> impl IntoResponse {
    scope_view(request, "organization")
}

// ═══════════════════════════════════════════════════════════════════════════════
// Threat Models
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct ThreatModelList {
    pub scope: ScopeFilter,
    pub items: Vec<ThreatModel>,
}

pub async fn list_threat_models(
    State(state): State<AppState>,
    request: AuthorizedRequest,
) -> impl IntoResponse {
    let items = state
        .threat_models
        .iter()
        .filter(|m| request.scope.permits(&m.owner))
        .cloned()
        .collect();

    Json(ApiResponse::success(ThreatModelList {
        scope: request.scope,
        items,
    }))
}

/// Records outside the caller's scope are reported as missing.
pub async fn get_threat_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: AuthorizedRequest,
) -> Result<impl IntoResponse, WardenError> {
    let model = state
        .threat_models
        .iter()
        .find(|m| m.id == id && request.scope.permits(&m.owner))
        .cloned()
        .ok_or_else(|| WardenError::not_found("threat model", &id))?;

    Ok(Json(ApiResponse::success(model)))
}
