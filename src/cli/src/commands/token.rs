//! Development session tokens.
//!
//! Signs claims with the configured `auth.jwt_secret`, issuer and audience so
//! the result is accepted by a server running the same configuration.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use serde::Serialize;

use warden_core::config::Config;
use warden_core::rbac::{Claims, Role};

use crate::output::{self, OutputFormat};
use crate::policy::PolicyContext;

#[derive(Args)]
pub struct TokenArgs {
    /// Subject user id
    #[arg(short, long)]
    user: String,

    /// Role (ADMIN, BUSINESS_ADMIN, BUSINESS_USER, USER)
    #[arg(short, long)]
    role: Role,

    /// Organization id
    #[arg(long)]
    org: Option<String>,

    /// Lifetime in minutes
    #[arg(long, default_value = "60")]
    ttl_minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Lifetime from `--ttl-minutes`, rejecting values that are not positive or
/// that push the expiry past what a timestamp can hold.
fn lifetime(ttl_minutes: i64) -> Result<(Duration, DateTime<Utc>)> {
    if ttl_minutes <= 0 {
        anyhow::bail!("--ttl-minutes must be positive");
    }
    let ttl = Duration::try_minutes(ttl_minutes)
        .with_context(|| format!("--ttl-minutes {} is out of range", ttl_minutes))?;
    let expires_at = Utc::now()
        .checked_add_signed(ttl)
        .with_context(|| format!("--ttl-minutes {} is out of range", ttl_minutes))?;
    Ok((ttl, expires_at))
}

/// Claims for `args`, carrying the configured issuer and audience.
fn claims(args: &TokenArgs, config: &Config) -> Result<Claims> {
    let (ttl, expires_at) = lifetime(args.ttl_minutes)?;
    let mut claims = Claims::new(args.user.clone(), args.role, ttl);
    claims.exp = expires_at.timestamp();
    if let Some(org) = &args.org {
        claims = claims.org_id(org.clone());
    }
    if let Some(issuer) = &config.auth.issuer {
        claims = claims.issuer(issuer.clone());
    }
    if let Some(audience) = &config.auth.audience {
        claims = claims.audience(audience.clone());
    }
    Ok(claims)
}

pub fn execute(args: TokenArgs, ctx: &PolicyContext, format: OutputFormat) -> Result<()> {
    let resolver = ctx.config.build_resolver()?;
    let claims = claims(&args, &ctx.config)?;
    let expires_at = DateTime::from_timestamp(claims.exp, 0).context("Expiry out of range")?;
    let token = resolver.issue(&claims).context("Failed to sign token")?;

    match format {
        OutputFormat::Table => {
            output::print_header("Session Token");
            output::print_detail("User", &args.user);
            output::print_detail("Role", args.role.wire_name());
            output::print_detail("Organization", args.org.as_deref().unwrap_or("-"));
            output::print_detail("Expires", &expires_at.to_rfc3339());
            println!();
            println!("{}", token);
        }
        _ => output::print_item(&IssuedToken { token, expires_at }, format)?,
    }
    Ok(())
}
