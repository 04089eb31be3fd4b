//! The permission table: which roles hold which named permission.
//!
//! The table is built once at startup, validated, and then only read. It is
//! handed to the [`AccessEvaluator`](super::policy::AccessEvaluator) behind an
//! `Arc`, so tests can build their own table instead of touching shared state.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::models::Permission;
use super::policy::PolicyError;
use super::roles::Role;

/// Immutable mapping from [`Permission`] to the roles that hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTable {
    holders: HashMap<Permission, HashSet<Role>>,
}

impl PermissionTable {
    /// Build a table from explicit entries.
    ///
    /// Fails when a permission has no holders, or when a platform-only
    /// permission is granted to anyone but [`Role::PlatformAdmin`].
    pub fn new<I, R>(entries: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = (Permission, R)>,
        R: IntoIterator<Item = Role>,
    {
        let holders: HashMap<Permission, HashSet<Role>> = entries
            .into_iter()
            .map(|(perm, roles)| (perm, roles.into_iter().collect()))
            .collect();

        for (perm, roles) in &holders {
            validate_entry(*perm, roles)?;
        }

        Ok(Self { holders })
    }

    /// The shipped policy. Platform admins hold every permission.
    pub fn defaults() -> Self {
        use Permission::*;
        use Role::*;

        let everyone = || Role::ALL.to_vec();
        let admins = || vec![PlatformAdmin, OrgAdmin];

        let holders = [
            (AccessAdminInterface, vec![PlatformAdmin]),
            (ManageAllUsers, vec![PlatformAdmin]),
            (ManageAllOrganizations, vec![PlatformAdmin]),
            (ViewPlatformAnalytics, vec![PlatformAdmin]),
            (AccessBusinessAdminInterface, admins()),
            (ManageOrganizationUsers, admins()),
            (ManageOrganizationSettings, admins()),
            (ViewOrganizationAnalytics, admins()),
            (ViewOrganizationThreatModels, admins()),
            (CreateThreatModels, everyone()),
            (ViewOwnThreatModels, everyone()),
            (UseAiAnalysis, everyone()),
            (GenerateReports, everyone()),
        ]
        .into_iter()
        .map(|(perm, roles)| (perm, roles.into_iter().collect()))
        .collect();

        Self { holders }
    }

    /// Replace the holder sets of the given permissions, keeping the rest.
    pub fn with_overrides<I, R>(mut self, overrides: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = (Permission, R)>,
        R: IntoIterator<Item = Role>,
    {
        for (perm, roles) in overrides {
            let roles: HashSet<Role> = roles.into_iter().collect();
            validate_entry(perm, &roles)?;
            debug!(permission = %perm, holders = roles.len(), "Overriding permission holders");
            self.holders.insert(perm, roles);
        }
        Ok(self)
    }

    /// Roles holding `permission`.
    ///
    /// A permission missing from the table is a programming error on the
    /// caller's side and is reported as [`PolicyError::UnknownPermission`].
    pub fn holders(&self, permission: Permission) -> Result<&HashSet<Role>, PolicyError> {
        self.holders
            .get(&permission)
            .ok_or_else(|| PolicyError::UnknownPermission(permission.to_string()))
    }

    /// Permissions present in the table, in declaration order.
    pub fn permissions(&self) -> Vec<Permission> {
        Permission::ALL
            .into_iter()
            .filter(|p| self.holders.contains_key(p))
            .collect()
    }

    /// Permissions held by `role`, in declaration order.
    pub fn permissions_of(&self, role: Role) -> Vec<Permission> {
        Permission::ALL
            .into_iter()
            .filter(|p| self.holders.get(p).is_some_and(|roles| roles.contains(&role)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::defaults()
    }
}

fn validate_entry(permission: Permission, roles: &HashSet<Role>) -> Result<(), PolicyError> {
    if roles.is_empty() {
        return Err(PolicyError::InvalidPermissionTable(format!(
            "permission {} has no holders",
            permission
        )));
    }

    if permission.is_platform_only() && roles.iter().any(|r| *r != Role::PlatformAdmin) {
        return Err(PolicyError::InvalidPermissionTable(format!(
            "permission {} is platform-only but is granted to other roles",
            permission
        )));
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
