//! Role-based access control and multi-tenant scoping.
//!
//! This module provides:
//! - **Roles**: the closed four-level hierarchy and its ranks
//! - **Permission Table**: which roles hold which named capability
//! - **Access Evaluator**: permission, manage and assign decisions
//! - **Tenant Checks**: organization boundaries and missing-organization detection
//! - **Scope Filters**: the data-visibility boundary derived from an actor
//! - **Request Authorizer**: the per-request state machine built on the above
//! - **Middleware**: tower layer and axum extractor wiring it into a router
//!
//! # Usage
//!
//! ```rust,ignore
//! use warden_core::rbac::{AccessEvaluator, Actor, Permission, Role, build_scope};
//!
//! let evaluator = AccessEvaluator::with_defaults();
//! let actor = Actor::new("u-1", Role::OrgAdmin).in_organization("acme");
//!
//! assert!(evaluator.has_permission(actor.role, Permission::ManageOrganizationUsers)?);
//! let scope = build_scope(&actor)?; // OrganizationScoped("acme")
//! ```

pub mod authorizer;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod policy;
pub mod resolver;
pub mod roles;
pub mod routes;
pub mod scope;
pub mod tenant;

pub use authorizer::{AuthorizationOutcome, DenialReason, RequestAuthorizer};
pub use middleware::{AuthorizeLayer, AuthorizeService, AuthorizedRequest};
pub use models::{Actor, OrganizationId, Permission, ResourceOwner, UserId};
pub use permissions::PermissionTable;
pub use policy::{can_assign_role, can_manage, AccessEvaluator, PolicyError};
pub use resolver::{ActorResolver, Claims, JwtActorResolver, StaticActorResolver};
pub use roles::Role;
pub use routes::{RouteEntry, RouteRequirement, RouteTable};
pub use scope::{build_scope, ScopeFilter};
pub use tenant::{requires_organization, same_tenant};
