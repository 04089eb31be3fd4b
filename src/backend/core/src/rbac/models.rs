//! Authorization data models: identifiers, the request actor, resource owner
//! references and the named permissions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::policy::PolicyError;
use super::roles::Role;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed organization (tenant) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrganizationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Actor
// ═══════════════════════════════════════════════════════════════════════════════

/// The authenticated caller of a request.
///
/// Built once per request from verified token state and never mutated
/// afterwards. `organization_id` is absent for unaffiliated legacy users and
/// usually for platform admins, who are implicitly global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(id),
            role,
            organization_id: None,
        }
    }

    /// Attach the actor's organization.
    pub fn in_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(OrganizationId::new(organization_id));
        self
    }

    pub fn organization(&self) -> Option<&OrganizationId> {
        self.organization_id.as_ref()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resource Owner
// ═══════════════════════════════════════════════════════════════════════════════

/// The minimal view of a record needed to decide whether an actor may touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOwner {
    pub owner_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_organization_id: Option<OrganizationId>,
}

impl ResourceOwner {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: UserId::new(owner_id),
            owner_organization_id: None,
        }
    }

    pub fn in_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.owner_organization_id = Some(OrganizationId::new(organization_id));
        self
    }

    /// Owner reference for a record created by `actor`.
    pub fn of(actor: &Actor) -> Self {
        Self {
            owner_id: actor.id.clone(),
            owner_organization_id: actor.organization_id.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Permission
// ═══════════════════════════════════════════════════════════════════════════════

/// A named capability. Which roles hold it is decided by the
/// [`PermissionTable`](super::permissions::PermissionTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // Platform administration
    AccessAdminInterface,
    ManageAllUsers,
    ManageAllOrganizations,
    ViewPlatformAnalytics,

    // Organization administration
    AccessBusinessAdminInterface,
    ManageOrganizationUsers,
    ManageOrganizationSettings,
    ViewOrganizationAnalytics,
    ViewOrganizationThreatModels,

    // Everyday work
    CreateThreatModels,
    ViewOwnThreatModels,
    UseAiAnalysis,
    GenerateReports,
}

impl Permission {
    pub const ALL: [Permission; 13] = [
        Self::AccessAdminInterface,
        Self::ManageAllUsers,
        Self::ManageAllOrganizations,
        Self::ViewPlatformAnalytics,
        Self::AccessBusinessAdminInterface,
        Self::ManageOrganizationUsers,
        Self::ManageOrganizationSettings,
        Self::ViewOrganizationAnalytics,
        Self::ViewOrganizationThreatModels,
        Self::CreateThreatModels,
        Self::ViewOwnThreatModels,
        Self::UseAiAnalysis,
        Self::GenerateReports,
    ];

    /// Canonical snake_case name, as used in configuration files.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AccessAdminInterface => "access_admin_interface",
            Self::ManageAllUsers => "manage_all_users",
            Self::ManageAllOrganizations => "manage_all_organizations",
            Self::ViewPlatformAnalytics => "view_platform_analytics",
            Self::AccessBusinessAdminInterface => "access_business_admin_interface",
            Self::ManageOrganizationUsers => "manage_organization_users",
            Self::ManageOrganizationSettings => "manage_organization_settings",
            Self::ViewOrganizationAnalytics => "view_organization_analytics",
            Self::ViewOrganizationThreatModels => "view_organization_threat_models",
            Self::CreateThreatModels => "create_threat_models",
            Self::ViewOwnThreatModels => "view_own_threat_models",
            Self::UseAiAnalysis => "use_ai_analysis",
            Self::GenerateReports => "generate_reports",
        }
    }

    /// Permissions that may only ever be held by [`Role::PlatformAdmin`].
    pub const fn is_platform_only(&self) -> bool {
        match self {
            Self::AccessAdminInterface
            | Self::ManageAllUsers
            | Self::ManageAllOrganizations
            | Self::ViewPlatformAnalytics => true,
            Self::AccessBusinessAdminInterface
            | Self::ManageOrganizationUsers
            | Self::ManageOrganizationSettings
            | Self::ViewOrganizationAnalytics
            | Self::ViewOrganizationThreatModels
            | Self::CreateThreatModels
            | Self::ViewOwnThreatModels
            | Self::UseAiAnalysis
            | Self::GenerateReports => false,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| PolicyError::UnknownPermission(s.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
