//! Role hierarchy listing.

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use warden_core::rbac::Role;

use crate::output::{self, OutputFormat};
use crate::policy::PolicyContext;

#[derive(Debug, Serialize, Tabled)]
pub struct RoleRow {
    #[tabled(rename = "Role")]
    pub role: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Rank")]
    pub rank: u8,
    #[tabled(rename = "Needs Org")]
    pub tenant_scoped: bool,
    #[tabled(rename = "Permissions")]
    pub permissions: usize,
    #[tabled(rename = "Description")]
    pub description: String,
}

pub fn rows(ctx: &PolicyContext) -> Vec<RoleRow> {
    let table = ctx.authorizer.evaluator().table();
    Role::ALL
        .into_iter()
        .map(|role| RoleRow {
            role: role.wire_name().to_string(),
            name: role.name().to_string(),
            rank: role.rank(),
            tenant_scoped: role.is_tenant_scoped(),
            permissions: table.permissions_of(role).len(),
            description: role.description().to_string(),
        })
        .collect()
}

pub fn execute(ctx: &PolicyContext, format: OutputFormat) -> Result<()> {
    output::print_list(&rows(ctx), format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_follow_hierarchy() {
        let rows = rows(&PolicyContext::default());
        let names: Vec<&str> = rows.iter().map(|r| r.role.as_str()).collect();
        assert_eq!(names, ["ADMIN", "BUSINESS_ADMIN", "BUSINESS_USER", "USER"]);
        assert_eq!(rows[0].permissions, 13);
        assert_eq!(rows[3].permissions, 4);
        assert!(rows[1].tenant_scoped);
        assert!(!rows[3].tenant_scoped);
    }
}
