//! The closed role set and its hierarchy.
//!
//! Warden knows exactly four roles:
//!
//! | Role          | Wire name        | Rank | Scope                           |
//! |---------------|------------------|------|---------------------------------|
//! | PlatformAdmin | `ADMIN`          | 4    | Global, implicitly every tenant |
//! | OrgAdmin      | `BUSINESS_ADMIN` | 3    | One organization                |
//! | OrgUser       | `BUSINESS_USER`  | 2    | One organization, own records   |
//! | LegacyUser    | `USER`           | 1    | Unaffiliated, own records       |
//!
//! Ranks exist only for comparison; they are never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::policy::PolicyError;

/// A caller's role.
///
/// Variants are declared from most to least privileged. Compare privilege
/// through [`Role::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN", alias = "platform_admin")]
    PlatformAdmin,
    #[serde(rename = "BUSINESS_ADMIN", alias = "org_admin")]
    OrgAdmin,
    #[serde(rename = "BUSINESS_USER", alias = "org_user")]
    OrgUser,
    #[serde(rename = "USER", alias = "legacy_user")]
    LegacyUser,
}

impl Role {
    /// Every role, most privileged first.
    pub const ALL: [Role; 4] = [
        Self::PlatformAdmin,
        Self::OrgAdmin,
        Self::OrgUser,
        Self::LegacyUser,
    ];

    /// Position in the hierarchy. Higher outranks lower.
    pub const fn rank(&self) -> u8 {
        match self {
            Self::PlatformAdmin => 4,
            Self::OrgAdmin => 3,
            Self::OrgUser => 2,
            Self::LegacyUser => 1,
        }
    }

    /// Name carried in tokens and stored user records.
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::PlatformAdmin => "ADMIN",
            Self::OrgAdmin => "BUSINESS_ADMIN",
            Self::OrgUser => "BUSINESS_USER",
            Self::LegacyUser => "USER",
        }
    }

    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PlatformAdmin => "Platform Admin",
            Self::OrgAdmin => "Organization Admin",
            Self::OrgUser => "Organization User",
            Self::LegacyUser => "Legacy User",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Self::PlatformAdmin => "Operates the whole platform across every organization",
            Self::OrgAdmin => "Administers one organization and its members",
            Self::OrgUser => "Member of one organization, works on own records",
            Self::LegacyUser => "Unaffiliated account from before organizations existed",
        }
    }

    /// Roles whose members must belong to exactly one organization.
    pub const fn is_tenant_scoped(&self) -> bool {
        match self {
            Self::OrgAdmin | Self::OrgUser => true,
            Self::PlatformAdmin | Self::LegacyUser => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Role {
    type Err = PolicyError;

    /// Accepts the wire name or the snake_case variant name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "ADMIN" | "PLATFORM_ADMIN" => Ok(Self::PlatformAdmin),
            "BUSINESS_ADMIN" | "ORG_ADMIN" => Ok(Self::OrgAdmin),
            "BUSINESS_USER" | "ORG_USER" => Ok(Self::OrgUser),
            "USER" | "LEGACY_USER" => Ok(Self::LegacyUser),
            _ => Err(PolicyError::InvalidRole(s.to_string())),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
