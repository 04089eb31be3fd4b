//! Scope filters: how much data an actor may see.
//!
//! [`build_scope`] is the single place deciding visibility. The resulting
//! [`ScopeFilter`] is handed to the data layer for one request and then
//! dropped; organization membership can change between requests, so filters
//! are never cached.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::models::{Actor, OrganizationId, ResourceOwner, UserId};
use super::policy::PolicyError;
use super::roles::Role;

/// Declarative row filter for the data layer.
///
/// - `Unrestricted`: no filter at all.
/// - `OrganizationScoped(org)`: rows whose owner belongs to `org`.
/// - `SelfScoped(user)`: rows owned by `user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum ScopeFilter {
    Unrestricted,
    OrganizationScoped(OrganizationId),
    SelfScoped(UserId),
}

impl ScopeFilter {
    /// Would a record owned by `owner` pass this filter?
    pub fn permits(&self, owner: &ResourceOwner) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::OrganizationScoped(org) => owner.owner_organization_id.as_ref() == Some(org),
            Self::SelfScoped(user) => &owner.owner_id == user,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }
}

impl fmt::Display for ScopeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrestricted => write!(f, "unrestricted"),
            Self::OrganizationScoped(org) => write!(f, "organization:{}", org),
            Self::SelfScoped(user) => write!(f, "self:{}", user),
        }
    }
}

/// Derive the scope filter for `actor`.
///
/// An organization admin without an organization is rejected with
/// [`PolicyError::MissingOrganizationContext`] instead of being narrowed to
/// self scope, so the misconfiguration blocks the request.
pub fn build_scope(actor: &Actor) -> Result<ScopeFilter, PolicyError> {
    match actor.role {
        Role::PlatformAdmin => Ok(ScopeFilter::Unrestricted),
        Role::OrgAdmin => actor
            .organization_id
            .clone()
            .map(ScopeFilter::OrganizationScoped)
            .ok_or_else(|| PolicyError::MissingOrganizationContext {
                actor: actor.id.clone(),
                role: actor.role,
            }),
        Role::OrgUser | Role::LegacyUser => Ok(ScopeFilter::SelfScoped(actor.id.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_admin_is_unrestricted() {
        let actor = Actor::new("root", Role::PlatformAdmin);
        assert_eq!(build_scope(&actor).unwrap(), ScopeFilter::Unrestricted);

        let with_org = Actor::new("root", Role::PlatformAdmin).in_organization("acme");
        assert_eq!(build_scope(&with_org).unwrap(), ScopeFilter::Unrestricted);
    }

    #[test]
    fn test_org_admin_is_organization_scoped() {
        let actor = Actor::new("a1", Role::OrgAdmin).in_organization("acme");
        assert_eq!(
            build_scope(&actor).unwrap(),
            ScopeFilter::OrganizationScoped(OrganizationId::new("acme"))
        );
    }

    #[test]
    fn test_org_admin_without_org_fails_closed() {
        let actor = Actor::new("a1", Role::OrgAdmin);
        assert_eq!(
            build_scope(&actor).unwrap_err(),
            PolicyError::MissingOrganizationContext {
                actor: UserId::new("a1"),
                role: Role::OrgAdmin,
            }
        );
    }

    #[test]
    fn test_org_user_is_self_scoped() {
        let actor = Actor::new("u1", Role::OrgUser).in_organization("acme");
        assert_eq!(build_scope(&actor).unwrap(), ScopeFilter::SelfScoped(UserId::new("u1")));
    }

    #[test]
    fn test_legacy_user_is_self_scoped() {
        let actor = Actor::new("u2", Role::LegacyUser);
        assert_eq!(build_scope(&actor).unwrap(), ScopeFilter::SelfScoped(UserId::new("u2")));
    }

    #[test]
    fn test_permits() {
        let mine = ResourceOwner::new("u1").in_organization("acme");
        let colleague = ResourceOwner::new("u7").in_organization("acme");
        let orphan = ResourceOwner::new("u8");

        assert!(ScopeFilter::Unrestricted.permits(&orphan));

        let org = ScopeFilter::OrganizationScoped(OrganizationId::new("acme"));
        assert!(org.permits(&mine));
        assert!(org.permits(&colleague));
        assert!(!org.permits(&orphan));

        let own = ScopeFilter::SelfScoped(UserId::new("u1"));
        assert!(own.permits(&mine));
        assert!(!own.permits(&colleague));
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_value(ScopeFilter::OrganizationScoped(OrganizationId::new("acme")))
            .unwrap();
        assert_eq!(json, serde_json::json!({"scope": "organization_scoped", "id": "acme"}));

        let json = serde_json::to_value(ScopeFilter::Unrestricted).unwrap();
        assert_eq!(json, serde_json::json!({"scope": "unrestricted"}));
    }
}
