//! InterAlpha authorization CLI.
//!
//! Inspects the employee role table and exercises the client access-key
//! lifecycle against an in-memory backend.
//!
//! # Quick Start
//!
//! ```bash
//! # Role table
//! interalpha-auth roles
//!
//! # Can a technician change an order's status?
//! interalpha-auth check technician ordens_servico.change_status
//!
//! # Which permissions does a route need, and does the role have them?
//! interalpha-auth route atendente POST /api/clientes
//!
//! # Issue, validate and revoke a throwaway key
//! interalpha-auth demo-key
//! ```

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use interalpha_config::ConfigLoader;
use tracing_subscriber::EnvFilter;

/// InterAlpha authorization tooling.
#[derive(Parser)]
#[command(name = "interalpha-auth")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Extra config file, applied over interalpha.toml and interalpha.local.toml.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List roles with their levels and descriptions.
    Roles,

    /// List every permission pattern a role holds, inherited ones included.
    Permissions {
        role: String,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check whether a role holds a permission. Exits 1 when denied.
    Check { role: String, permission: String },

    /// List roles strictly below the given role.
    Manageable { role: String },

    /// Authorize a role against an API route. Exits 1 when denied.
    Route {
        role: String,

        /// HTTP method (GET, POST, PUT, PATCH, DELETE).
        method: String,

        /// Request path, query string allowed.
        path: String,
    },

    /// Print the effective configuration as TOML.
    Config,

    /// Issue, validate and revoke a key against an in-memory store.
    DemoKey {
        /// Client id for the demo client.
        #[arg(long, default_value = "cliente-demo")]
        client: String,

        /// Key lifetime in hours (defaults to access_keys.default_ttl_secs).
        #[arg(long)]
        ttl_hours: Option<i64>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_file(path);
    }
    let config = loader.load()?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let granted = match cli.command {
        Commands::Roles => commands::roles::list().map(|()| true),
        Commands::Permissions { role, json } => {
            commands::roles::permissions(&role, json).map(|()| true)
        }
        Commands::Check { role, permission } => commands::roles::check(&role, &permission),
        Commands::Manageable { role } => commands::roles::manageable(&role).map(|()| true),
        Commands::Route { role, method, path } => commands::route::run(&role, &method, &path),
        Commands::Config => commands::config::show(&config, cli.config.as_deref()).map(|()| true),
        Commands::DemoKey { client, ttl_hours } => {
            commands::demo::run(&config, &client, ttl_hours).map(|()| true)
        }
    }?;

    Ok(if granted {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
