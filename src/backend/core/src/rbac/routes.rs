//! Per-route authorization requirements.
//!
//! Every route prefix declares, once at startup, which roles it accepts, which
//! permission it needs and whether the caller must belong to an organization.
//! Lookups use the longest matching prefix.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::models::Permission;
use super::policy::PolicyError;
use super::roles::Role;

// ═══════════════════════════════════════════════════════════════════════════════
// Route Requirement
// ═══════════════════════════════════════════════════════════════════════════════

/// What a route demands from its caller. Each check is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequirement {
    /// Acceptable roles; `None` accepts any authenticated role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,

    /// Permission the caller's role must hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<Permission>,

    /// Reject tenant-scoped callers that have no organization.
    #[serde(default)]
    pub requires_organization: bool,
}

impl RouteRequirement {
    /// Any authenticated role is accepted.
    pub fn authenticated() -> Self {
        Self::default().with_roles(Role::ALL)
    }

    /// Requires `permission`.
    pub fn permission(permission: Permission) -> Self {
        Self {
            permission: Some(permission),
            ..Self::default()
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = Some(roles.into_iter().collect());
        self
    }

    pub fn requiring_organization(mut self) -> Self {
        self.requires_organization = true;
        self
    }

    fn validate(&self, prefix: &str) -> Result<(), PolicyError> {
        if let Some(roles) = &self.roles {
            if roles.is_empty() {
                return Err(PolicyError::InvalidRouteTable(format!(
                    "route {} accepts no roles",
                    prefix
                )));
            }
        }
        Ok(())
    }
}

/// A route prefix and its requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub prefix: String,
    #[serde(flatten)]
    pub requirement: RouteRequirement,
}

impl RouteEntry {
    pub fn new(prefix: impl Into<String>, requirement: RouteRequirement) -> Self {
        Self {
            prefix: prefix.into(),
            requirement,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Route Table
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable lookup table from request path to [`RouteRequirement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    /// Sorted by descending prefix length so the first match is the longest.
    entries: Vec<RouteEntry>,
    public_paths: Vec<String>,
    fallback: RouteRequirement,
}

impl RouteTable {
    /// Build a validated table. Paths matching no entry get
    /// [`RouteRequirement::authenticated`].
    pub fn new(entries: Vec<RouteEntry>) -> Result<Self, PolicyError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !entry.prefix.starts_with('/') {
                return Err(PolicyError::InvalidRouteTable(format!(
                    "route prefix {:?} must start with '/'",
                    entry.prefix
                )));
            }
            if !seen.insert(normalize(&entry.prefix)) {
                return Err(PolicyError::InvalidRouteTable(format!(
                    "route prefix {} declared twice",
                    entry.prefix
                )));
            }
            entry.requirement.validate(&entry.prefix)?;
        }

        let mut entries = entries;
        entries.sort_by(|a, b| normalize(&b.prefix).len().cmp(&normalize(&a.prefix).len()));

        Ok(Self {
            entries,
            public_paths: vec!["/health".to_string()],
            fallback: RouteRequirement::authenticated(),
        })
    }

    /// The shipped route policy.
    pub fn defaults() -> Self {
        Self {
            entries: default_entries(),
            public_paths: vec!["/health".to_string()],
            fallback: RouteRequirement::authenticated(),
        }
    }

    /// Replace the paths that skip authorization entirely.
    pub fn with_public_paths(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.public_paths = paths.into_iter().collect();
        self
    }

    /// Requirement for paths that match no entry.
    pub fn with_fallback(mut self, fallback: RouteRequirement) -> Self {
        self.fallback = fallback;
        self
    }

    /// Public paths bypass authorization. Matching follows the same segment
    /// rules as [`RouteTable::lookup`].
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| prefix_matches(p, path))
    }

    /// Requirement for `path`: longest matching prefix, else the fallback.
    pub fn lookup(&self, path: &str) -> &RouteRequirement {
        self.entries
            .iter()
            .find(|e| prefix_matches(&e.prefix, path))
            .map(|e| &e.requirement)
            .unwrap_or(&self.fallback)
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn public_paths(&self) -> &[String] {
        &self.public_paths
    }

    pub fn fallback(&self) -> &RouteRequirement {
        &self.fallback
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::defaults()
    }
}

fn default_entries() -> Vec<RouteEntry> {
    vec![
        RouteEntry::new(
            "/api/business",
            RouteRequirement::permission(Permission::AccessBusinessAdminInterface)
                .requiring_organization(),
        ),
        RouteEntry::new(
            "/api/admin",
            RouteRequirement::permission(Permission::AccessAdminInterface),
        ),
        RouteEntry::new("/api", RouteRequirement::authenticated()),
    ]
}

fn normalize(prefix: &str) -> &str {
    if prefix.len() > 1 {
        prefix.trim_end_matches('/')
    } else {
        prefix
    }
}

/// `/api/admin` matches `/api/admin` and `/api/admin/users`, never
/// `/api/administrator`.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    let prefix = normalize(prefix);
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
