//! Configuration management.
//!
//! Sources, in increasing precedence: built-in defaults, an optional TOML
//! file, then `WARDEN__*` environment variables (`WARDEN__AUTH__JWT_SECRET`,
//! `WARDEN__SERVER__PORT`, ...).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, WardenError};
use crate::rbac::{
    AccessEvaluator, JwtActorResolver, Permission, PermissionTable, RequestAuthorizer, Role,
    RouteEntry, RouteRequirement, RouteTable,
};
use crate::telemetry::{LoggingConfig, MetricsConfig};

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret for session tokens
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Expected `iss` claim
    #[serde(default)]
    pub issuer: Option<String>,

    /// Expected `aud` claim
    #[serde(default)]
    pub audience: Option<String>,

    /// Leeway for expiration checks (in seconds)
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,

    /// Bound on actor resolution; slower lookups count as no session
    #[serde(default = "default_resolve_timeout", with = "humantime_serde")]
    pub resolve_timeout: Duration,

    /// Header carrying `Bearer <token>`
    #[serde(default = "default_bearer_header")]
    pub bearer_header: String,

    /// Paths that skip authorization entirely
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: None,
            audience: None,
            leeway_secs: default_leeway_secs(),
            resolve_timeout: default_resolve_timeout(),
            bearer_header: default_bearer_header(),
            public_paths: default_public_paths(),
        }
    }
}

/// Permission overrides and route requirements.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfig {
    /// Replaces the holder set of each listed permission
    #[serde(default)]
    pub permissions: HashMap<Permission, Vec<Role>>,

    /// Route entries; empty means the shipped defaults
    #[serde(default)]
    pub routes: Vec<RouteEntry>,

    /// Requirement for paths matching no route
    #[serde(default)]
    pub fallback: Option<RouteRequirement>,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_leeway_secs() -> u64 { 60 }
fn default_resolve_timeout() -> Duration { Duration::from_secs(2) }
fn default_bearer_header() -> String { "Authorization".to_string() }
fn default_public_paths() -> Vec<String> { vec!["/health".to_string(), "/metrics".to_string()] }

impl Config {
    /// Load configuration from the environment only.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(environment())
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load from a TOML file, with the environment layered on top.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(environment())
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Permission table: shipped defaults with `policy.permissions` applied.
    pub fn build_permission_table(&self) -> Result<PermissionTable> {
        Ok(PermissionTable::defaults().with_overrides(self.policy.permissions.clone())?)
    }

    /// Route table from `policy.routes`, public paths and fallback.
    pub fn build_route_table(&self) -> Result<RouteTable> {
        let table = if self.policy.routes.is_empty() {
            RouteTable::defaults()
        } else {
            RouteTable::new(self.policy.routes.clone())?
        };

        let table = table.with_public_paths(self.auth.public_paths.clone());
        Ok(match &self.policy.fallback {
            Some(fallback) => table.with_fallback(fallback.clone()),
            None => table,
        })
    }

    /// Authorizer over the configured tables. Fails on invalid policy.
    pub fn build_authorizer(&self) -> Result<RequestAuthorizer> {
        let evaluator = AccessEvaluator::new(Arc::new(self.build_permission_table()?));
        Ok(RequestAuthorizer::new(evaluator, Arc::new(self.build_route_table()?)))
    }

    /// JWT resolver from the `auth` section. Requires a non-empty secret.
    pub fn build_resolver(&self) -> Result<JwtActorResolver> {
        let secret = self
            .auth
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| WardenError::configuration("auth.jwt_secret must be set"))?;

        let mut resolver = JwtActorResolver::new(secret).with_leeway(self.auth.leeway_secs);
        if let Some(issuer) = &self.auth.issuer {
            resolver = resolver.with_issuer(issuer);
        }
        if let Some(audience) = &self.auth.audience {
            resolver = resolver.with_audience(audience);
        }
        Ok(resolver)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("WARDEN")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("auth.public_paths")
}
