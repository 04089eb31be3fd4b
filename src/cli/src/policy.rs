//! Policy loading for the CLI.
//!
//! The CLI evaluates policy locally: it builds the same tables the server
//! would from the same configuration sources.

use anyhow::{Context, Result};
use std::path::Path;

use warden_core::config::Config;
use warden_core::rbac::RequestAuthorizer;

/// Configuration plus the authorizer built from it.
pub struct PolicyContext {
    pub config: Config,
    pub authorizer: RequestAuthorizer,
}

impl PolicyContext {
    /// Load from `path` when given, otherwise from `WARDEN__*` variables
    /// alone. Invalid policy is an error, never a silent fallback.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load policy from {}", path.display()))?,
            None => Config::load().context("Failed to load configuration from environment")?,
        };
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let authorizer = config
            .build_authorizer()
            .context("Policy is invalid")?;
        Ok(Self { config, authorizer })
    }
}

impl Default for PolicyContext {
    fn default() -> Self {
        Self {
            config: Config::default(),
            authorizer: RequestAuthorizer::with_defaults(),
        }
    }
}
