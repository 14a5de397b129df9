pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::app::AppState;
use crate::config::AppConfig;
use crate::schema::FileDeclarationSource;

#[derive(Parser)]
#[command(name = "monk")]
#[command(about = "Monk CLI - Tenant registry and provisioning operations")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Tenant registry and database provisioning")]
    Tenant {
        #[command(subcommand)]
        cmd: commands::tenant::TenantCommands,
    },

    #[command(about = "Inspect synthesized table schemas")]
    Schema {
        #[command(subcommand)]
        cmd: commands::schema::SchemaCommands,
    },

    #[command(about = "Authentication and token management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Services for one CLI invocation, wired the same way as the server
pub fn state(config: &AppConfig) -> AppState {
    let source = Arc::new(FileDeclarationSource::new(config.tenancy.declarations_path.clone()));
    AppState::new(config.clone(), source)
}

pub async fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Tenant { cmd } => commands::tenant::handle(cmd, &state(config), output_format).await,
        Commands::Schema { cmd } => commands::schema::handle(cmd, &state(config), output_format).await,
        Commands::Auth { cmd } => commands::auth::handle(cmd, config, output_format).await,
    }
}
