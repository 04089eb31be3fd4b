//! Organization boundary checks.
//!
//! Together with [`build_scope`](super::scope::build_scope) this is the only
//! place that special-cases [`Role::PlatformAdmin`]; everything else works
//! from rank and the permission table alone.

use super::models::{Actor, OrganizationId};
use super::roles::Role;

/// Is `target` inside the actor's tenant?
///
/// Platform admins are in every tenant. Otherwise the organizations must be
/// equal, where two missing organizations count as equal: unaffiliated legacy
/// users share the "no organization" population.
pub fn same_tenant(actor: &Actor, target: Option<&OrganizationId>) -> bool {
    if actor.role == Role::PlatformAdmin {
        return true;
    }

    match (actor.organization_id.as_ref(), target) {
        (Some(own), Some(target)) => own == target,
        (None, None) => true,
        (Some(_), None) | (None, Some(_)) => false,
    }
}

/// True when a tenant-scoped role has no organization assigned.
///
/// That only happens when stored user data is inconsistent, e.g. the
/// organization was deleted underneath its members.
pub fn requires_organization(actor: &Actor) -> bool {
    actor.role.is_tenant_scoped() && actor.organization_id.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(id: &str) -> OrganizationId {
        OrganizationId::new(id)
    }

    #[test]
    fn test_platform_admin_is_everywhere() {
        let admin = Actor::new("root", Role::PlatformAdmin);
        assert!(same_tenant(&admin, Some(&org("acme"))));
        assert!(same_tenant(&admin, None));

        let affiliated = Actor::new("root", Role::PlatformAdmin).in_organization("globex");
        assert!(same_tenant(&affiliated, Some(&org("acme"))));
    }

    #[test]
    fn test_org_admin_boundaries() {
        let admin = Actor::new("a1", Role::OrgAdmin).in_organization("A");
        assert!(same_tenant(&admin, Some(&org("A"))));
        assert!(!same_tenant(&admin, Some(&org("B"))));
        assert!(!same_tenant(&admin, None));
    }

    #[test]
    fn test_unaffiliated_users_share_no_org_population() {
        let legacy = Actor::new("u1", Role::LegacyUser);
        assert!(same_tenant(&legacy, None));
        assert!(!same_tenant(&legacy, Some(&org("acme"))));
    }

    #[test]
    fn test_requires_organization() {
        assert!(requires_organization(&Actor::new("a", Role::OrgAdmin)));
        assert!(requires_organization(&Actor::new("b", Role::OrgUser)));
        assert!(!requires_organization(
            &Actor::new("c", Role::OrgUser).in_organization("acme")
        ));
        assert!(!requires_organization(&Actor::new("d", Role::LegacyUser)));
        assert!(!requires_organization(&Actor::new("e", Role::PlatformAdmin)));
    }
}
