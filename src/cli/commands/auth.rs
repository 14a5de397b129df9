use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims, ROOT_ACCESS};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::types::TenantSlug;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Mint a session token")]
    Token {
        #[arg(help = "User name placed in the token")]
        user: String,
        #[arg(long, help = "Tenant slug the principal belongs to")]
        tenant: Option<String>,
        #[arg(long, help = "Grant root access (tenant management routes)")]
        root: bool,
        #[arg(long, help = "User id (random when omitted)")]
        user_id: Option<Uuid>,
    },
}

pub async fn handle(cmd: AuthCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Token { user, tenant, root, user_id } => {
            let tenant = tenant.map(TenantSlug::parse).transpose()?.map(String::from);
            let access = if root { ROOT_ACCESS } else { "full" };

            let claims = Claims::new(
                user,
                user_id.unwrap_or_else(Uuid::new_v4),
                access.to_string(),
                tenant,
                config.security.jwt_expiry_hours,
            );
            let token = generate_jwt(&claims, &config.security.jwt_secret)?;

            match output_format {
                OutputFormat::Text => println!("{}", token),
                OutputFormat::Json => output_success(
                    output_format,
                    "Token generated",
                    Some(json!({ "token": token, "claims": claims })),
                )?,
            }
            Ok(())
        }
    }
}
