//! Request authorizer: the composition root of the policy layer.
//!
//! Given the caller's identity and the route's declared requirement, the
//! authorizer ends in exactly one of three states:
//!
//! - `Allowed(scope)`: the handler runs with `scope` applied to its queries.
//! - `Denied(reason)`: expected policy outcome, mapped to 401/403.
//! - `Error(cause)`: inconsistent configuration or data, mapped to a generic 500.
//!
//! Checks run in a fixed order: session, role set, permission, organization
//! membership, then scope construction. Each decision is a pure function of
//! its inputs; there is nothing to retry.

use metrics::counter;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use axum::http::StatusCode;

use super::models::Actor;
use super::policy::{AccessEvaluator, PolicyError};
use super::resolver::ActorResolver;
use super::routes::{RouteRequirement, RouteTable};
use super::scope::{build_scope, ScopeFilter};
use super::tenant::requires_organization;
use crate::telemetry::AUDIT_TARGET;

// ═══════════════════════════════════════════════════════════════════════════════
// Outcome
// ═══════════════════════════════════════════════════════════════════════════════

/// Why a request was refused. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    NoSession,
    InsufficientRole,
    InsufficientPermission,
    OrganizationRequired,
}

impl DenialReason {
    /// Message returned to the caller.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoSession => "no session",
            Self::InsufficientRole => "insufficient role",
            Self::InsufficientPermission => "insufficient permission",
            Self::OrganizationRequired => "organization required",
        }
    }

    /// Machine-readable code for API bodies and metrics labels.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoSession => "NO_SESSION",
            Self::InsufficientRole => "INSUFFICIENT_ROLE",
            Self::InsufficientPermission => "INSUFFICIENT_PERMISSION",
            Self::OrganizationRequired => "ORGANIZATION_REQUIRED",
        }
    }

    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::NoSession => StatusCode::UNAUTHORIZED,
            Self::InsufficientRole | Self::InsufficientPermission | Self::OrganizationRequired => {
                StatusCode::FORBIDDEN
            }
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of one authorization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Allowed(ScopeFilter),
    Denied(DenialReason),
    Error(PolicyError),
}

impl AuthorizationOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The scope filter, if the request was allowed.
    pub fn scope(&self) -> Option<&ScopeFilter> {
        match self {
            Self::Allowed(scope) => Some(scope),
            Self::Denied(_) | Self::Error(_) => None,
        }
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            Self::Denied(reason) => Some(*reason),
            Self::Allowed(_) | Self::Error(_) => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Allowed(_) => "allowed",
            Self::Denied(_) => "denied",
            Self::Error(_) => "error",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Request Authorizer
// ═══════════════════════════════════════════════════════════════════════════════

/// Stateless per-request authorizer.
///
/// Holds only the shared evaluator and route table; both are immutable, so
/// one instance serves every concurrent request.
#[derive(Debug, Clone)]
pub struct RequestAuthorizer {
    evaluator: AccessEvaluator,
    routes: Arc<RouteTable>,
}

impl RequestAuthorizer {
    pub fn new(evaluator: AccessEvaluator, routes: Arc<RouteTable>) -> Self {
        Self { evaluator, routes }
    }

    /// Authorizer over the shipped permission and route tables.
    pub fn with_defaults() -> Self {
        Self::new(AccessEvaluator::with_defaults(), Arc::new(RouteTable::defaults()))
    }

    pub fn evaluator(&self) -> &AccessEvaluator {
        &self.evaluator
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide a request against an explicit requirement.
    ///
    /// `actor` is `None` when no verifiable identity was presented.
    pub fn authorize(
        &self,
        actor: Option<&Actor>,
        requirement: &RouteRequirement,
    ) -> AuthorizationOutcome {
        let Some(actor) = actor else {
            return AuthorizationOutcome::Denied(DenialReason::NoSession);
        };

        if let Some(roles) = &requirement.roles {
            if !roles.contains(&actor.role) {
                return AuthorizationOutcome::Denied(DenialReason::InsufficientRole);
            }
        }

        if let Some(permission) = requirement.permission {
            match self.evaluator.has_permission(actor.role, permission) {
                Ok(true) => {}
                Ok(false) => {
                    return AuthorizationOutcome::Denied(DenialReason::InsufficientPermission)
                }
                Err(e) => return AuthorizationOutcome::Error(e),
            }
        }

        if requirement.requires_organization && requires_organization(actor) {
            return AuthorizationOutcome::Denied(DenialReason::OrganizationRequired);
        }

        match build_scope(actor) {
            Ok(scope) => AuthorizationOutcome::Allowed(scope),
            Err(e) => AuthorizationOutcome::Error(e),
        }
    }

    /// Decide a request for `path`, using the route table's requirement.
    pub fn authorize_path(&self, actor: Option<&Actor>, path: &str) -> AuthorizationOutcome {
        let requirement = self.routes.lookup(path);
        let outcome = self.authorize(actor, requirement);
        record(actor, path, &outcome);
        outcome
    }

    /// Resolve the caller from a raw token, then decide the request.
    ///
    /// Applies no timeout of its own; callers that need one wrap this future
    /// and treat expiry as a missing session.
    pub async fn authorize_token<R>(
        &self,
        resolver: &R,
        token: Option<&str>,
        path: &str,
    ) -> (Option<Actor>, AuthorizationOutcome)
    where
        R: ActorResolver + ?Sized,
    {
        let actor = match token {
            Some(token) => resolver.resolve(token).await,
            None => None,
        };
        let outcome = self.authorize_path(actor.as_ref(), path);
        (actor, outcome)
    }
}

impl Default for RequestAuthorizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Emit the audit event and decision counter for one outcome.
fn record(actor: Option<&Actor>, path: &str, outcome: &AuthorizationOutcome) {
    let user_id = actor.map(|a| a.id.as_str()).unwrap_or("-");
    let role = actor.map(|a| a.role.wire_name()).unwrap_or("-");
    let org_id = actor
        .and_then(|a| a.organization_id.as_ref())
        .map(|o| o.as_str())
        .unwrap_or("-");

    match outcome {
        AuthorizationOutcome::Allowed(scope) => {
            debug!(user_id, role, org_id, path, scope = %scope, "Request authorized");
        }
        AuthorizationOutcome::Denied(reason) => {
            info!(
                target: AUDIT_TARGET,
                user_id,
                role,
                org_id,
                path,
                reason = reason.as_str(),
                "Request denied"
            );
        }
        AuthorizationOutcome::Error(cause) => {
            error!(
                user_id,
                role,
                org_id,
                path,
                error = %cause,
                "Authorization failed on inconsistent policy or identity data"
            );
        }
    }

    let reason = outcome.denial_reason().map(|r| r.code()).unwrap_or("");
    counter!(
        "warden_authz_decisions_total",
        "outcome" => outcome.label(),
        "reason" => reason,
    )
    .increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::models::{OrganizationId, Permission, UserId};
    use crate::rbac::permissions::PermissionTable;
    use crate::rbac::roles::Role;

    fn authorizer() -> RequestAuthorizer {
        RequestAuthorizer::with_defaults()
    }

    fn business_route() -> RouteRequirement {
        RouteRequirement::permission(Permission::AccessBusinessAdminInterface)
            .requiring_organization()
    }

    #[test]
    fn test_no_actor_is_no_session() {
        let outcome = authorizer().authorize(None, &RouteRequirement::authenticated());
        assert_eq!(outcome, AuthorizationOutcome::Denied(DenialReason::NoSession));
    }

    #[test]
    fn test_role_set_checked_before_permission() {
        let actor = Actor::new("u1", Role::OrgUser).in_organization("acme");
        let requirement = RouteRequirement::permission(Permission::AccessAdminInterface)
            .with_roles([Role::PlatformAdmin]);
        assert_eq!(
            authorizer().authorize(Some(&actor), &requirement),
            AuthorizationOutcome::Denied(DenialReason::InsufficientRole)
        );
    }

    #[test]
    fn test_legacy_user_denied_admin_interface() {
        let actor = Actor::new("u1", Role::LegacyUser);
        let requirement = RouteRequirement::permission(Permission::AccessAdminInterface);
        assert_eq!(
            authorizer().authorize(Some(&actor), &requirement),
            AuthorizationOutcome::Denied(DenialReason::InsufficientPermission)
        );
    }

    #[test]
    fn test_org_admin_allowed_business_route() {
        let actor = Actor::new("a1", Role::OrgAdmin).in_organization("acme");
        assert_eq!(
            authorizer().authorize(Some(&actor), &business_route()),
            AuthorizationOutcome::Allowed(ScopeFilter::OrganizationScoped(OrganizationId::new(
                "acme"
            )))
        );
    }

    #[test]
    fn test_org_user_denied_business_route() {
        let actor = Actor::new("u1", Role::OrgUser).in_organization("acme");
        assert_eq!(
            authorizer().authorize(Some(&actor), &business_route()),
            AuthorizationOutcome::Denied(DenialReason::InsufficientPermission)
        );
    }

    #[test]
    fn test_orphaned_org_admin_denied_before_scope() {
        let actor = Actor::new("a1", Role::OrgAdmin);
        assert_eq!(
            authorizer().authorize(Some(&actor), &business_route()),
            AuthorizationOutcome::Denied(DenialReason::OrganizationRequired)
        );
    }

    #[test]
    fn test_orphaned_org_admin_on_lenient_route_is_error() {
        let actor = Actor::new("a1", Role::OrgAdmin);
        let outcome = authorizer().authorize(Some(&actor), &RouteRequirement::authenticated());
        assert_eq!(
            outcome,
            AuthorizationOutcome::Error(PolicyError::MissingOrganizationContext {
                actor: UserId::new("a1"),
                role: Role::OrgAdmin,
            })
        );
    }

    #[test]
    fn test_unknown_permission_is_error_not_denial() {
        let table = PermissionTable::new([(Permission::GenerateReports, vec![Role::LegacyUser])])
            .unwrap();
        let authorizer = RequestAuthorizer::new(
            AccessEvaluator::new(Arc::new(table)),
            Arc::new(RouteTable::defaults()),
        );
        let actor = Actor::new("root", Role::PlatformAdmin);
        let outcome = authorizer.authorize(
            Some(&actor),
            &RouteRequirement::permission(Permission::ManageAllUsers),
        );
        assert!(outcome.is_error());
    }

    #[test]
    fn test_authorize_path_uses_route_table() {
        let actor = Actor::new("u1", Role::OrgUser).in_organization("acme");
        let a = authorizer();
        assert_eq!(
            a.authorize_path(Some(&actor), "/api/threat-models"),
            AuthorizationOutcome::Allowed(ScopeFilter::SelfScoped(UserId::new("u1")))
        );
        assert_eq!(
            a.authorize_path(Some(&actor), "/api/admin/users"),
            AuthorizationOutcome::Denied(DenialReason::InsufficientPermission)
        );
    }

    #[test]
    fn test_denial_reason_statuses() {
        assert_eq!(DenialReason::NoSession.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(DenialReason::InsufficientRole.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(DenialReason::InsufficientPermission.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(DenialReason::OrganizationRequired.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(DenialReason::OrganizationRequired.to_string(), "organization required");
    }

    /// Collects the target of every event it sees.
    struct TargetCapture(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for TargetCapture {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0
                .lock()
                .unwrap()
                .push(event.metadata().target().to_string());
        }
    }

    fn targets_of(run: impl FnOnce()) -> Vec<String> {
        use tracing_subscriber::layer::SubscriberExt;

        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(TargetCapture(seen.clone()));
        tracing::subscriber::with_default(subscriber, run);
        let targets = seen.lock().unwrap().clone();
        targets
    }

    #[test]
    fn test_denials_are_audited_under_audit_target() {
        let a = authorizer();
        let legacy = Actor::new("u-1", Role::LegacyUser);

        let targets = targets_of(|| {
            a.authorize_path(Some(&legacy), "/api/admin/users");
        });
        assert!(targets.iter().any(|t| t == AUDIT_TARGET), "{targets:?}");

        let root = Actor::new("root", Role::PlatformAdmin);
        let targets = targets_of(|| {
            a.authorize_path(Some(&root), "/api/admin/users");
        });
        assert!(!targets.is_empty());
        assert!(targets.iter().all(|t| t != AUDIT_TARGET), "{targets:?}");
    }
}
