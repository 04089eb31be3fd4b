//! Dry-run an authorization decision.
//!
//! The caller is given either as `--role/--user/--org` or as a session token
//! verified with the configured `auth.jwt_secret`. The requirement comes from
//! the route table (`--path`) or from ad-hoc flags.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use warden_core::rbac::{
    Actor, ActorResolver, AuthorizationOutcome, Permission, RouteRequirement, Role, ScopeFilter,
};

use crate::output::{self, OutputFormat};
use crate::policy::PolicyContext;

#[derive(Args)]
pub struct CheckArgs {
    /// Request path, looked up in the route table
    #[arg(long, conflicts_with_all = ["permission", "roles", "requires_org"])]
    path: Option<String>,

    /// Ad-hoc requirement: permission the caller must hold
    #[arg(long)]
    permission: Option<Permission>,

    /// Ad-hoc requirement: accepted roles (comma-separated)
    #[arg(long, value_delimiter = ',')]
    roles: Vec<Role>,

    /// Ad-hoc requirement: tenant-scoped callers must have an organization
    #[arg(long)]
    requires_org: bool,

    /// Caller role (ADMIN, BUSINESS_ADMIN, BUSINESS_USER, USER)
    #[arg(short, long, conflicts_with = "token")]
    role: Option<Role>,

    /// Caller user id
    #[arg(short, long, default_value = "cli-user")]
    user: String,

    /// Caller organization id
    #[arg(long, conflicts_with = "token")]
    org: Option<String>,

    /// Resolve the caller from a session token instead of --role
    #[arg(long)]
    token: Option<String>,
}

impl CheckArgs {
    fn requirement(&self) -> RouteRequirement {
        let mut requirement = match self.permission {
            Some(permission) => RouteRequirement::permission(permission),
            None => RouteRequirement::default(),
        };
        if !self.roles.is_empty() {
            requirement = requirement.with_roles(self.roles.iter().copied());
        }
        if self.requires_org {
            requirement = requirement.requiring_organization();
        }
        requirement
    }

    fn actor(&self) -> Option<Actor> {
        let role = self.role?;
        let actor = Actor::new(self.user.clone(), role);
        Some(match &self.org {
            Some(org) => actor.in_organization(org.clone()),
            None => actor,
        })
    }
}

/// Result of one dry run.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub actor: Option<Actor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub requirement: Option<RouteRequirement>,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Decide for `actor` on `path`, or on `requirement` when no path is given.
pub fn evaluate(
    ctx: &PolicyContext,
    actor: Option<Actor>,
    path: Option<&str>,
    requirement: RouteRequirement,
) -> CheckReport {
    let authorizer = &ctx.authorizer;

    if let Some(path) = path {
        if authorizer.routes().is_public(path) {
            return CheckReport {
                actor,
                path: Some(path.to_string()),
                requirement: None,
                outcome: "public",
                scope: None,
                reason: None,
            };
        }
    }

    let (requirement, outcome) = match path {
        Some(path) => (
            authorizer.routes().lookup(path).clone(),
            authorizer.authorize_path(actor.as_ref(), path),
        ),
        None => {
            let outcome = authorizer.authorize(actor.as_ref(), &requirement);
            (requirement, outcome)
        }
    };

    let (label, scope, reason) = match outcome {
        AuthorizationOutcome::Allowed(scope) => ("allowed", Some(scope), None),
        AuthorizationOutcome::Denied(reason) => ("denied", None, Some(reason.to_string())),
        AuthorizationOutcome::Error(cause) => ("error", None, Some(cause.to_string())),
    };

    CheckReport {
        actor,
        path: path.map(str::to_string),
        requirement: Some(requirement),
        outcome: label,
        scope,
        reason,
    }
}

pub async fn execute(args: CheckArgs, ctx: &PolicyContext, format: OutputFormat) -> Result<()> {
    let actor = match &args.token {
        Some(token) => ctx.config.build_resolver()?.resolve(token).await,
        None => args.actor(),
    };

    let report = evaluate(ctx, actor, args.path.as_deref(), args.requirement());

    match format {
        OutputFormat::Table => print_report(&report),
        _ => output::print_item(&report, format)?,
    }
    Ok(())
}

fn print_report(report: &CheckReport) {
    output::print_header("Authorization Check");

    match &report.actor {
        Some(actor) => {
            output::print_detail("User", actor.id.as_str());
            output::print_detail("Role", actor.role.wire_name());
            output::print_detail(
                "Organization",
                actor.organization_id.as_ref().map(|o| o.as_str()).unwrap_or("-"),
            );
        }
        None => output::print_detail("Caller", "none"),
    }
    if let Some(path) = &report.path {
        output::print_detail("Path", path);
    }
    println!();

    match (report.outcome, &report.scope, &report.reason) {
        ("public", _, _) => output::print_success("Public path, authorization skipped"),
        ("allowed", Some(scope), _) => output::print_success(&format!("Allowed with scope {}", scope)),
        ("denied", _, Some(reason)) => output::print_denied(reason),
        (_, _, reason) => output::print_error(reason.as_deref().unwrap_or("policy error")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PolicyContext {
        PolicyContext::default()
    }

    #[test]
    fn test_path_check_allowed_with_scope() {
        let actor = Actor::new("a-1", Role::OrgAdmin).in_organization("acme");
        let report = evaluate(&ctx(), Some(actor), Some("/api/business/members"), RouteRequirement::default());

        assert_eq!(report.outcome, "allowed");
        assert_eq!(report.scope.unwrap().to_string(), "organization:acme");
    }

    #[test]
    fn test_path_check_denied() {
        let actor = Actor::new("u-1", Role::LegacyUser);
        let report = evaluate(&ctx(), Some(actor), Some("/api/admin"), RouteRequirement::default());

        assert_eq!(report.outcome, "denied");
        assert_eq!(report.reason.as_deref(), Some("insufficient permission"));
    }

    #[test]
    fn test_public_path() {
        let report = evaluate(&ctx(), None, Some("/health"), RouteRequirement::default());
        assert_eq!(report.outcome, "public");
    }

    #[test]
    fn test_missing_caller_is_no_session() {
        let report = evaluate(&ctx(), None, Some("/api/threat-models"), RouteRequirement::default());
        assert_eq!(report.reason.as_deref(), Some("no session"));
    }

    #[test]
    fn test_ad_hoc_requirement() {
        let requirement = RouteRequirement::permission(Permission::ManageOrganizationUsers)
            .requiring_organization();

        let orphan = Actor::new("a-2", Role::OrgAdmin);
        let report = evaluate(&ctx(), Some(orphan), None, requirement.clone());
        assert_eq!(report.reason.as_deref(), Some("organization required"));

        let root = Actor::new("root", Role::PlatformAdmin);
        let report = evaluate(&ctx(), Some(root), None, requirement);
        assert_eq!(report.scope, Some(ScopeFilter::Unrestricted));
    }

    #[test]
    fn test_orphaned_admin_on_general_route_is_error() {
        let orphan = Actor::new("a-2", Role::OrgAdmin);
        let report = evaluate(&ctx(), Some(orphan), Some("/api/threat-models"), RouteRequirement::default());
        assert_eq!(report.outcome, "error");
    }
}
