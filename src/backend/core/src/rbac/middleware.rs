//! Axum authorization middleware.
//!
//! Runs the [`RequestAuthorizer`] on every request: pulls the bearer token,
//! resolves it to an actor under a timeout, looks up the route requirement and
//! either forwards the request with an [`AuthorizedRequest`] attached or
//! answers with a JSON error.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service};
use tracing::warn;

use super::authorizer::{AuthorizationOutcome, DenialReason, RequestAuthorizer};
use super::models::Actor;
use super::resolver::ActorResolver;
use super::scope::ScopeFilter;
use crate::error::WardenError;

/// Default bound on actor resolution.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);

// ═══════════════════════════════════════════════════════════════════════════════
// Authorized Request (extracted in handlers)
// ═══════════════════════════════════════════════════════════════════════════════

/// The verified caller and the scope its queries must apply.
///
/// Inserted into request extensions only when authorization ended in
/// `Allowed`, so a handler that extracts it can trust both fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizedRequest {
    pub actor: Actor,
    pub scope: ScopeFilter,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthorizedRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthorizedRequest>()
            .cloned()
            .ok_or_else(|| {
                let body = serde_json::json!({
                    "success": false,
                    "error": {
                        "code": "MISSING_AUTHORIZATION_CONTEXT",
                        "message": "Authorization context not available. Ensure the authorization layer is applied.",
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer that authorizes every request against the route table.
///
/// # Example
///
/// ```rust,ignore
/// use warden_core::rbac::{AuthorizeLayer, RequestAuthorizer, StaticActorResolver};
///
/// let layer = AuthorizeLayer::new(
///     Arc::new(RequestAuthorizer::with_defaults()),
///     Arc::new(StaticActorResolver::new()),
/// );
///
/// let app = Router::new()
///     .route("/api/threat-models", get(list_threat_models))
///     .layer(layer);
/// ```
#[derive(Clone)]
pub struct AuthorizeLayer {
    authorizer: Arc<RequestAuthorizer>,
    resolver: Arc<dyn ActorResolver>,
    header: String,
    resolve_timeout: Duration,
}

impl AuthorizeLayer {
    pub fn new(authorizer: Arc<RequestAuthorizer>, resolver: Arc<dyn ActorResolver>) -> Self {
        Self {
            authorizer,
            resolver,
            header: "Authorization".to_string(),
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    /// Header carrying the bearer token.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Resolution slower than this counts as no session.
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }
}

impl<S> Layer<S> for AuthorizeLayer {
    type Service = AuthorizeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizeService {
            inner,
            layer: self.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Service
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct AuthorizeService<S> {
    inner: S,
    layer: AuthorizeLayer,
}

impl<S> Service<Request<Body>> for AuthorizeService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let layer = self.layer.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = request.uri().path().to_string();

            if layer.authorizer.routes().is_public(&path) {
                return inner.call(request).await;
            }

            let token = extract_bearer(request.headers(), &layer.header);
            let resolution = tokio::time::timeout(
                layer.resolve_timeout,
                layer
                    .authorizer
                    .authorize_token(&*layer.resolver, token.as_deref(), &path),
            )
            .await;

            let (actor, outcome) = match resolution {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        path = %path,
                        timeout_ms = layer.resolve_timeout.as_millis() as u64,
                        "Actor resolution timed out"
                    );
                    counter!("warden_actor_resolution_total", "result" => "timeout").increment(1);
                    (None, layer.authorizer.authorize_path(None, &path))
                }
            };

            match (outcome, actor) {
                (AuthorizationOutcome::Allowed(scope), Some(actor)) => {
                    request
                        .extensions_mut()
                        .insert(AuthorizedRequest { actor, scope });
                    inner.call(request).await
                }
                (AuthorizationOutcome::Denied(reason), _) => Ok(denial_response(reason)),
                (AuthorizationOutcome::Error(cause), _) => {
                    Ok(WardenError::from(cause).into_response())
                }
                (AuthorizationOutcome::Allowed(_), None) => Ok(WardenError::internal(
                    "authorization allowed a request without an actor",
                )
                .into_response()),
            }
        })
    }
}

/// Pull the token out of `Bearer <token>`.
pub fn extract_bearer(headers: &HeaderMap, header: &str) -> Option<String> {
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").or_else(|| s.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Build the 401/403 response for a denial, in the shared error body shape.
pub fn denial_response(reason: DenialReason) -> Response {
    WardenError::from(reason).into_response()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers, "Authorization"), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer(&headers, "Authorization").as_deref(), Some("abc.def"));

        headers.insert("Authorization", HeaderValue::from_static("bearer xyz"));
        assert_eq!(extract_bearer(&headers, "Authorization").as_deref(), Some("xyz"));

        headers.insert("Authorization", HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(extract_bearer(&headers, "Authorization"), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers, "Authorization"), None);
    }

    #[test]
    fn test_custom_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Session", HeaderValue::from_static("Bearer t1"));
        assert_eq!(extract_bearer(&headers, "X-Session").as_deref(), Some("t1"));
        assert_eq!(extract_bearer(&headers, "Authorization"), None);
    }

    #[test]
    fn test_denial_response_status() {
        assert_eq!(
            denial_response(DenialReason::NoSession).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            denial_response(DenialReason::OrganizationRequired).status(),
            StatusCode::FORBIDDEN
        );
    }
}
