//! CLI subcommands.

pub mod assignments;
pub mod check;
pub mod permissions;
pub mod roles;
pub mod routes;
pub mod token;
