//! Permission matrix.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use warden_core::rbac::{Permission, PermissionTable, Role};

use crate::output::{self, mark, OutputFormat};
use crate::policy::PolicyContext;

#[derive(Args)]
pub struct PermissionsArgs {
    /// Only show permissions held by this role
    #[arg(short, long)]
    role: Option<Role>,
}

#[derive(Debug, Serialize, Tabled)]
pub struct PermissionRow {
    #[tabled(rename = "Permission")]
    pub permission: String,
    #[tabled(rename = "ADMIN")]
    #[serde(skip)]
    pub platform_admin: String,
    #[tabled(rename = "BUSINESS_ADMIN")]
    #[serde(skip)]
    pub org_admin: String,
    #[tabled(rename = "BUSINESS_USER")]
    #[serde(skip)]
    pub org_user: String,
    #[tabled(rename = "USER")]
    #[serde(skip)]
    pub legacy_user: String,
    #[tabled(skip)]
    pub holders: Vec<Role>,
    #[tabled(rename = "Platform Only")]
    pub platform_only: bool,
}

pub fn rows(table: &PermissionTable, role: Option<Role>) -> Vec<PermissionRow> {
    table
        .permissions()
        .into_iter()
        .filter_map(|permission| {
            let holders: Vec<Role> = Role::ALL
                .into_iter()
                .filter(|r| table.holders(permission).is_ok_and(|set| set.contains(r)))
                .collect();
            if role.is_some_and(|r| !holders.contains(&r)) {
                return None;
            }
            Some(row(permission, holders))
        })
        .collect()
}

fn row(permission: Permission, holders: Vec<Role>) -> PermissionRow {
    let cell = |role: Role| mark(holders.contains(&role));
    PermissionRow {
        permission: permission.as_str().to_string(),
        platform_admin: cell(Role::PlatformAdmin),
        org_admin: cell(Role::OrgAdmin),
        org_user: cell(Role::OrgUser),
        legacy_user: cell(Role::LegacyUser),
        platform_only: permission.is_platform_only(),
        holders,
    }
}

pub fn execute(args: PermissionsArgs, ctx: &PolicyContext, format: OutputFormat) -> Result<()> {
    let rows = rows(ctx.authorizer.evaluator().table(), args.role);
    output::print_list(&rows, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matrix() {
        let rows = rows(&PermissionTable::defaults(), None);
        assert_eq!(rows.len(), Permission::ALL.len());

        let admin = rows
            .iter()
            .find(|r| r.permission == "access_admin_interface")
            .unwrap();
        assert_eq!(admin.holders, vec![Role::PlatformAdmin]);
        assert!(admin.platform_only);
        assert_eq!(admin.org_admin, "-");
    }

    #[test]
    fn test_filter_by_role() {
        let rows = rows(&PermissionTable::defaults(), Some(Role::LegacyUser));
        let names: Vec<&str> = rows.iter().map(|r| r.permission.as_str()).collect();
        assert_eq!(
            names,
            [
                "create_threat_models",
                "view_own_threat_models",
                "use_ai_analysis",
                "generate_reports"
            ]
        );
    }
}
