//! Configuration loading tests.
//!
//! Tests cover:
//! - TOML policy files (permission overrides, routes, fallback)
//! - humantime durations
//! - Rejection of invalid policy at load or build time

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use warden_core::config::Config;
use warden_core::rbac::{Actor, AuthorizationOutcome, DenialReason, Permission, Role, ScopeFilter};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const POLICY: &str = r#"
[server]
port = 9090

[auth]
jwt_secret = "file-secret"
issuer = "warden-test"
resolve_timeout = "750ms"
public_paths = ["/health", "/status"]

[policy.permissions]
generate_reports = ["ADMIN", "BUSINESS_ADMIN"]

[[policy.routes]]
prefix = "/api/reports"
permission = "generate_reports"

[[policy.routes]]
prefix = "/api/business"
permission = "access_business_admin_interface"
requires_organization = true

[policy.fallback]
roles = ["ADMIN"]
"#;

#[test]
fn test_load_policy_file() {
    let file = write_config(POLICY);
    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.server.port, 9090);
    assert_eq!(config.auth.resolve_timeout, Duration::from_millis(750));
    assert_eq!(config.auth.issuer.as_deref(), Some("warden-test"));
    assert_eq!(config.policy.routes.len(), 2);
    assert_eq!(
        config.policy.permissions.get(&Permission::GenerateReports),
        Some(&vec![Role::PlatformAdmin, Role::OrgAdmin])
    );
}

#[test]
fn test_policy_file_drives_authorizer() {
    let file = write_config(POLICY);
    let config = Config::from_file(file.path()).unwrap();
    let authorizer = config.build_authorizer().unwrap();

    assert!(authorizer.routes().is_public("/status"));
    assert!(!authorizer.routes().is_public("/metrics"));

    let user = Actor::new("u-1", Role::OrgUser).in_organization("acme");
    assert_eq!(
        authorizer.authorize_path(Some(&user), "/api/reports/q3"),
        AuthorizationOutcome::Denied(DenialReason::InsufficientPermission)
    );

    let admin = Actor::new("a-1", Role::OrgAdmin).in_organization("acme");
    assert!(authorizer.authorize_path(Some(&admin), "/api/reports/q3").is_allowed());

    // Unlisted paths fall back to platform admins only.
    assert_eq!(
        authorizer.authorize_path(Some(&admin), "/api/threat-models"),
        AuthorizationOutcome::Denied(DenialReason::InsufficientRole)
    );
    let root = Actor::new("root", Role::PlatformAdmin);
    assert_eq!(
        authorizer.authorize_path(Some(&root), "/api/threat-models"),
        AuthorizationOutcome::Allowed(ScopeFilter::Unrestricted)
    );
}

#[test]
fn test_policy_file_builds_resolver() {
    let file = write_config(POLICY);
    let config = Config::from_file(file.path()).unwrap();
    assert!(config.build_resolver().is_ok());
}

#[test]
fn test_minimal_file_uses_defaults() {
    let file = write_config("[server]\nhost = \"127.0.0.1\"\n");
    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.auth.resolve_timeout, Duration::from_secs(2));
    assert!(config.build_authorizer().is_ok());
    assert!(config.build_resolver().is_err());
}

#[test]
fn test_unknown_role_in_file_is_rejected() {
    let file = write_config(
        r#"
[policy.permissions]
generate_reports = ["SUPERUSER"]
"#,
    );
    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn test_relative_route_prefix_is_rejected_at_build() {
    let file = write_config(
        r#"
[[policy.routes]]
prefix = "api/locked"
roles = ["ADMIN"]
"#,
    );
    let config = Config::from_file(file.path()).unwrap();
    assert!(config.build_authorizer().is_err());
}

#[test]
fn test_missing_file_is_error() {
    assert!(Config::from_file("/nonexistent/warden.toml").is_err());
}
