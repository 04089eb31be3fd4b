//! Access evaluator: the pure decision functions behind every request.
//!
//! The evaluator answers three questions:
//! - does role R hold permission P?
//! - can role A manage (edit, suspend, remove) a user with role B?
//! - can role A grant role B to somebody?
//!
//! Managing and assigning are separate relations. An organization admin can
//! manage an organization user but must never be able to mint another
//! organization admin, so `can_assign_role` is its own table and is not
//! derived from rank.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::models::{Actor, Permission, ResourceOwner, UserId};
use super::permissions::PermissionTable;
use super::roles::Role;
use super::scope::build_scope;
use super::tenant::same_tenant;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors raised by the policy layer.
///
/// None of these are policy denials: each one means configuration or stored
/// data is inconsistent and the request must fail closed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    #[error("Actor {actor} has role {role} but no organization")]
    MissingOrganizationContext { actor: UserId, role: Role },

    #[error("Invalid permission table: {0}")]
    InvalidPermissionTable(String),

    #[error("Invalid route table: {0}")]
    InvalidRouteTable(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role relations
// ═══════════════════════════════════════════════════════════════════════════════

/// True iff `manager` strictly outranks `target`.
///
/// No role manages its own rank, so admins of the same level can never act
/// on each other.
pub const fn can_manage(manager: Role, target: Role) -> bool {
    manager.rank() > target.rank()
}

/// Closed assignment policy: which roles may grant which role labels.
pub const fn can_assign_role(assigner: Role, target: Role) -> bool {
    match target {
        Role::PlatformAdmin | Role::OrgAdmin => matches!(assigner, Role::PlatformAdmin),
        Role::OrgUser => matches!(assigner, Role::PlatformAdmin | Role::OrgAdmin),
        // Being phased out; only platform admins may still hand it out.
        Role::LegacyUser => matches!(assigner, Role::PlatformAdmin),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Access Evaluator
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluates permissions against an injected, immutable [`PermissionTable`].
///
/// Cloning is cheap and the evaluator holds no mutable state, so a single
/// instance is shared by every request task.
#[derive(Debug, Clone)]
pub struct AccessEvaluator {
    table: Arc<PermissionTable>,
}

impl AccessEvaluator {
    pub fn new(table: Arc<PermissionTable>) -> Self {
        Self { table }
    }

    /// Evaluator over the shipped permission table.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(PermissionTable::defaults()))
    }

    pub fn table(&self) -> &PermissionTable {
        &self.table
    }

    /// Does `role` hold `permission`?
    pub fn has_permission(&self, role: Role, permission: Permission) -> Result<bool, PolicyError> {
        let granted = self.table.holders(permission)?.contains(&role);
        debug!(role = %role, permission = %permission, granted, "Permission evaluated");
        Ok(granted)
    }

    /// True only if `role` holds every permission in `permissions`.
    pub fn has_all_permissions(
        &self,
        role: Role,
        permissions: &[Permission],
    ) -> Result<bool, PolicyError> {
        for permission in permissions {
            if !self.has_permission(role, *permission)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// True if `role` holds at least one permission in `permissions`.
    pub fn has_any_permission(
        &self,
        role: Role,
        permissions: &[Permission],
    ) -> Result<bool, PolicyError> {
        for permission in permissions {
            if self.has_permission(role, *permission)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn can_manage(&self, manager: Role, target: Role) -> bool {
        can_manage(manager, target)
    }

    pub fn can_assign_role(&self, assigner: Role, target: Role) -> bool {
        can_assign_role(assigner, target)
    }

    /// Can `manager` act on the user `target`?
    ///
    /// Requires both a strictly higher rank and a shared tenant.
    pub fn can_manage_actor(&self, manager: &Actor, target: &Actor) -> bool {
        can_manage(manager.role, target.role)
            && same_tenant(manager, target.organization_id.as_ref())
    }

    /// Can `assigner` change `target`'s role to `new_role`?
    ///
    /// The assigner must be allowed to grant the label, share the target's
    /// tenant, and outrank the target's current role.
    pub fn can_assign_role_to(&self, assigner: &Actor, target: &Actor, new_role: Role) -> bool {
        can_assign_role(assigner.role, new_role) && self.can_manage_actor(assigner, target)
    }

    /// Can `actor` read or modify the record owned by `owner`?
    ///
    /// Decided by the actor's scope filter, so this agrees with what the data
    /// layer returns for the same actor.
    pub fn can_access_resource(
        &self,
        actor: &Actor,
        owner: &ResourceOwner,
    ) -> Result<bool, PolicyError> {
        Ok(build_scope(actor)?.permits(owner))
    }
}

impl Default for AccessEvaluator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> AccessEvaluator {
        AccessEvaluator::with_defaults()
    }

    #[test]
    fn test_no_role_manages_itself() {
        for role in Role::ALL {
            assert!(!can_manage(role, role), "{role} manages itself");
        }
    }

    #[test]
    fn test_can_manage_follows_rank() {
        for a in Role::ALL {
            for b in Role::ALL {
                assert_eq!(can_manage(a, b), a.rank() > b.rank(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_org_admin_manages_lower_roles_only() {
        assert!(can_manage(Role::OrgAdmin, Role::OrgUser));
        assert!(can_manage(Role::OrgAdmin, Role::LegacyUser));
        assert!(!can_manage(Role::OrgAdmin, Role::OrgAdmin));
        assert!(!can_manage(Role::OrgAdmin, Role::PlatformAdmin));
    }

    #[test]
    fn test_platform_admin_assigns_everything() {
        for role in Role::ALL {
            assert!(can_assign_role(Role::PlatformAdmin, role));
        }
    }

    #[test]
    fn test_org_admin_assignment_limits() {
        assert!(!can_assign_role(Role::OrgAdmin, Role::PlatformAdmin));
        assert!(!can_assign_role(Role::OrgAdmin, Role::OrgAdmin));
        assert!(can_assign_role(Role::OrgAdmin, Role::OrgUser));
        // Manageable by rank, yet not assignable.
        assert!(can_manage(Role::OrgAdmin, Role::LegacyUser));
        assert!(!can_assign_role(Role::OrgAdmin, Role::LegacyUser));
    }

    #[test]
    fn test_lower_roles_assign_nothing() {
        for target in Role::ALL {
            assert!(!can_assign_role(Role::OrgUser, target));
            assert!(!can_assign_role(Role::LegacyUser, target));
        }
    }

    #[test]
    fn test_has_permission() {
        let eval = evaluator();
        assert!(eval.has_permission(Role::PlatformAdmin, Permission::AccessAdminInterface).unwrap());
        assert!(!eval.has_permission(Role::OrgAdmin, Permission::AccessAdminInterface).unwrap());
        assert!(eval
            .has_permission(Role::OrgAdmin, Permission::AccessBusinessAdminInterface)
            .unwrap());
        assert!(!eval
            .has_permission(Role::OrgUser, Permission::AccessBusinessAdminInterface)
            .unwrap());
        assert!(eval.has_permission(Role::LegacyUser, Permission::UseAiAnalysis).unwrap());
    }

    #[test]
    fn test_has_permission_unknown_fails() {
        let table = PermissionTable::new([(Permission::GenerateReports, vec![Role::OrgUser])]).unwrap();
        let eval = AccessEvaluator::new(Arc::new(table));
        assert!(matches!(
            eval.has_permission(Role::OrgUser, Permission::UseAiAnalysis),
            Err(PolicyError::UnknownPermission(_))
        ));
    }

    #[test]
    fn test_has_all_and_any() {
        let eval = evaluator();
        let perms = [Permission::CreateThreatModels, Permission::ManageOrganizationUsers];
        assert!(eval.has_all_permissions(Role::OrgAdmin, &perms).unwrap());
        assert!(!eval.has_all_permissions(Role::OrgUser, &perms).unwrap());
        assert!(eval.has_any_permission(Role::OrgUser, &perms).unwrap());
        assert!(!eval
            .has_any_permission(Role::OrgUser, &[Permission::ManageAllUsers])
            .unwrap());
    }

    #[test]
    fn test_can_manage_actor_respects_tenant() {
        let eval = evaluator();
        let admin = Actor::new("a1", Role::OrgAdmin).in_organization("acme");
        let member = Actor::new("u1", Role::OrgUser).in_organization("acme");
        let outsider = Actor::new("u2", Role::OrgUser).in_organization("globex");
        let legacy = Actor::new("u3", Role::LegacyUser);

        assert!(eval.can_manage_actor(&admin, &member));
        assert!(!eval.can_manage_actor(&admin, &outsider));
        assert!(!eval.can_manage_actor(&admin, &legacy));
        assert!(!eval.can_manage_actor(&member, &admin));

        let platform = Actor::new("root", Role::PlatformAdmin);
        assert!(eval.can_manage_actor(&platform, &outsider));
        assert!(eval.can_manage_actor(&platform, &legacy));
    }

    #[test]
    fn test_can_assign_role_to() {
        let eval = evaluator();
        let admin = Actor::new("a1", Role::OrgAdmin).in_organization("acme");
        let member = Actor::new("u1", Role::OrgUser).in_organization("acme");
        let outsider = Actor::new("u2", Role::OrgUser).in_organization("globex");

        assert!(eval.can_assign_role_to(&admin, &member, Role::OrgUser));
        assert!(!eval.can_assign_role_to(&admin, &member, Role::OrgAdmin));
        assert!(!eval.can_assign_role_to(&admin, &outsider, Role::OrgUser));

        let platform = Actor::new("root", Role::PlatformAdmin);
        assert!(eval.can_assign_role_to(&platform, &member, Role::OrgAdmin));
        let other_platform = Actor::new("root2", Role::PlatformAdmin);
        assert!(!eval.can_assign_role_to(&platform, &other_platform, Role::LegacyUser));
    }

    #[test]
    fn test_can_access_resource() {
        let eval = evaluator();
        let admin = Actor::new("a1", Role::OrgAdmin).in_organization("acme");
        let member = Actor::new("u1", Role::OrgUser).in_organization("acme");
        let doc = ResourceOwner::new("u1").in_organization("acme");
        let foreign = ResourceOwner::new("x9").in_organization("globex");

        assert!(eval.can_access_resource(&admin, &doc).unwrap());
        assert!(!eval.can_access_resource(&admin, &foreign).unwrap());
        assert!(eval.can_access_resource(&member, &doc).unwrap());
        assert!(!eval
            .can_access_resource(&member, &ResourceOwner::new("a1").in_organization("acme"))
            .unwrap());

        let orphan_admin = Actor::new("a2", Role::OrgAdmin);
        assert!(matches!(
            eval.can_access_resource(&orphan_admin, &doc),
            Err(PolicyError::MissingOrganizationContext { .. })
        ));
    }
}
