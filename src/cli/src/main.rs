//! Warden CLI - inspect and dry-run authorization policy.
//!
//! Provides commands for roles, permissions, role assignment, routes,
//! access checks and development tokens.

mod commands;
mod output;
mod policy;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{assignments, check, permissions, roles, routes, token};
use output::OutputFormat;
use policy::PolicyContext;

/// Warden - Authorization & Multi-Tenant Scoping Engine CLI
#[derive(Parser)]
#[command(
    name = "warden",
    version,
    about = "Warden - Authorization & Multi-Tenant Scoping Engine",
    long_about = "Inspect the role hierarchy and permission table, and dry-run authorization decisions against a policy file.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// TOML policy file (same format as the server configuration)
    #[arg(short, long, global = true, env = "WARDEN_CONFIG")]
    policy: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the role hierarchy
    Roles,

    /// Show which roles hold each permission
    Permissions(permissions::PermissionsArgs),

    /// Show which roles may manage or assign which
    Assignments,

    /// List the route table
    Routes,

    /// Dry-run an authorization decision
    Check(check::CheckArgs),

    /// Issue a development session token
    Token(token::TokenArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let format = cli.output;
    let result = match PolicyContext::load(cli.policy.as_deref()) {
        Ok(ctx) => match cli.command {
            Commands::Roles => roles::execute(&ctx, format),
            Commands::Permissions(args) => permissions::execute(args, &ctx, format),
            Commands::Assignments => assignments::execute(&ctx, format),
            Commands::Routes => routes::execute(&ctx, format),
            Commands::Check(args) => check::execute(args, &ctx, format).await,
            Commands::Token(args) => token::execute(args, &ctx, format),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
