//! Manage and role-assignment matrix.
//!
//! Each cell reads `assign`, `manage`, both, or `-` for the row role acting
//! on the column role.

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use warden_core::rbac::{AccessEvaluator, Role};

use crate::output::{self, OutputFormat};
use crate::policy::PolicyContext;

#[derive(Debug, Serialize, Tabled)]
pub struct AssignmentRow {
    #[tabled(rename = "Actor")]
    pub actor: String,
    #[tabled(rename = "ADMIN")]
    pub platform_admin: String,
    #[tabled(rename = "BUSINESS_ADMIN")]
    pub org_admin: String,
    #[tabled(rename = "BUSINESS_USER")]
    pub org_user: String,
    #[tabled(rename = "USER")]
    pub legacy_user: String,
}

fn cell(evaluator: &AccessEvaluator, actor: Role, target: Role) -> String {
    match (
        evaluator.can_assign_role(actor, target),
        evaluator.can_manage(actor, target),
    ) {
        (true, true) => "assign, manage".to_string(),
        (true, false) => "assign".to_string(),
        (false, true) => "manage".to_string(),
        (false, false) => "-".to_string(),
    }
}

pub fn rows(evaluator: &AccessEvaluator) -> Vec<AssignmentRow> {
    Role::ALL
        .into_iter()
        .map(|actor| AssignmentRow {
            actor: actor.wire_name().to_string(),
            platform_admin: cell(evaluator, actor, Role::PlatformAdmin),
            org_admin: cell(evaluator, actor, Role::OrgAdmin),
            org_user: cell(evaluator, actor, Role::OrgUser),
            legacy_user: cell(evaluator, actor, Role::LegacyUser),
        })
        .collect()
}

pub fn execute(ctx: &PolicyContext, format: OutputFormat) -> Result<()> {
    output::print_list(&rows(ctx.authorizer.evaluator()), format)
}
