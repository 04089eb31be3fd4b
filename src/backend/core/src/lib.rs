#![allow(clippy::result_large_err)]
//! # Warden Core
//!
//! Authorization and multi-tenant scoping for a role-hierarchical SaaS API.
//!
//! ## Architecture
//!
//! - **Roles**: closed four-level hierarchy (platform admin, organization admin,
//!   organization user, legacy user) with a strict rank order
//! - **Permissions**: named capabilities held by role sets, injected as an
//!   immutable table
//! - **Access Evaluator**: permission, manage and role-assignment decisions
//! - **Tenant Isolation**: organization boundary checks and scope filters
//!   handed to the data layer
//! - **Request Authorizer**: per-request state machine ending in allowed,
//!   denied or error
//! - **Middleware**: tower layer and axum extractor for the authorized context
//! - **Telemetry**: structured logging, audit events and Prometheus counters

pub mod api;
pub mod config;
pub mod error;
pub mod rbac;
pub mod telemetry;

pub use error::{ErrorCode, ErrorSeverity, Result, WardenError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{ErrorCode, Result, WardenError};
    pub use crate::rbac::{
        build_scope, can_assign_role, can_manage, requires_organization, same_tenant,
        AccessEvaluator, Actor, ActorResolver, AuthorizationOutcome, AuthorizeLayer,
        AuthorizedRequest, DenialReason, JwtActorResolver, OrganizationId, Permission,
        PermissionTable, PolicyError, RequestAuthorizer, ResourceOwner, Role, RouteEntry,
        RouteRequirement, RouteTable, ScopeFilter, StaticActorResolver, UserId,
    };
}
