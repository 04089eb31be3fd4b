//! Route table listing.

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use warden_core::rbac::{RouteRequirement, RouteTable};

use crate::output::{self, OutputFormat};
use crate::policy::PolicyContext;

#[derive(Debug, Serialize, Tabled)]
pub struct RouteRow {
    #[tabled(rename = "Prefix")]
    pub prefix: String,
    #[tabled(rename = "Roles")]
    pub roles: String,
    #[tabled(rename = "Permission")]
    pub permission: String,
    #[tabled(rename = "Needs Org")]
    pub requires_organization: bool,
}

fn row(prefix: &str, requirement: &RouteRequirement) -> RouteRow {
    RouteRow {
        prefix: prefix.to_string(),
        roles: match &requirement.roles {
            Some(roles) => roles
                .iter()
                .map(|r| r.wire_name())
                .collect::<Vec<_>>()
                .join(", "),
            None => "any".to_string(),
        },
        permission: requirement
            .permission
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "-".to_string()),
        requires_organization: requirement.requires_organization,
    }
}

/// Entries in match order, then public paths, then the fallback.
pub fn rows(table: &RouteTable) -> Vec<RouteRow> {
    let mut rows: Vec<RouteRow> = table
        .entries()
        .iter()
        .map(|e| row(&e.prefix, &e.requirement))
        .collect();

    rows.extend(table.public_paths().iter().map(|path| RouteRow {
        prefix: path.clone(),
        roles: "public".to_string(),
        permission: "-".to_string(),
        requires_organization: false,
    }));

    rows.push(row("(fallback)", table.fallback()));
    rows
}

pub fn execute(ctx: &PolicyContext, format: OutputFormat) -> Result<()> {
    output::print_list(&rows(ctx.authorizer.routes()), format)
}
