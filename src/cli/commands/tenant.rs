use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::cli::utils::{output_empty_collection, output_json, output_success};
use crate::cli::OutputFormat;
use crate::database::models::TenantRecord;
use crate::services::{NewTenant, ProvisionReport};
use crate::types::{TenantSlug, TenantStatus};

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "Create missing content-type tables in a tenant database")]
    Provision {
        #[arg(help = "Tenant slug")]
        slug: String,
    },

    #[command(about = "Provision every registered tenant")]
    Backfill,

    #[command(about = "Register a new tenant (provisions its database)")]
    Register {
        #[arg(help = "Tenant slug")]
        slug: String,
        #[arg(long, help = "Display name (defaults to the slug)")]
        name: Option<String>,
        #[arg(long, help = "Owning principal id")]
        owner: Option<Uuid>,
    },

    #[command(about = "List registered tenants")]
    List,

    #[command(about = "Suspend a tenant; it stops resolving")]
    Suspend {
        #[arg(help = "Tenant slug")]
        slug: String,
    },

    #[command(about = "Reactivate a suspended tenant")]
    Activate {
        #[arg(help = "Tenant slug")]
        slug: String,
    },

    #[command(about = "Change a tenant's slug; the old database file is left in place")]
    Rename {
        #[arg(help = "Current tenant slug")]
        slug: String,
        #[arg(help = "New tenant slug")]
        new_slug: String,
    },
}

pub async fn handle(cmd: TenantCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TenantCommands::Provision { slug } => {
            let slug = TenantSlug::parse(slug)?;
            // Tenants must be registered before they can be routed to
            state.registry.get(&slug).await?;

            let report = state.provisioner.provision_current(&slug).await?;
            print_report(&report, output_format)?;

            if !report.is_success() {
                anyhow::bail!("{} table(s) failed to provision", report.failed.len());
            }
            Ok(())
        }
        TenantCommands::Backfill => {
            let tenants = state.registry.list().await?;
            if tenants.is_empty() {
                return output_empty_collection(output_format, "reports", "No tenants registered");
            }

            let results = state.provisioner.backfill(&tenants).await?;
            let mut failures = 0;
            let mut reports = Vec::new();

            for (slug, result) in results {
                match result {
                    Ok(report) => {
                        if !report.is_success() {
                            failures += 1;
                        }
                        if output_format == OutputFormat::Text {
                            print_report(&report, output_format)?;
                            println!();
                        }
                        reports.push(json!(report));
                    }
                    Err(e) => {
                        failures += 1;
                        if output_format == OutputFormat::Text {
                            eprintln!("✗ {}: {}", slug, e);
                        }
                        reports.push(json!({ "slug": slug, "error": e.to_string() }));
                    }
                }
            }

            if output_format == OutputFormat::Json {
                output_json(&json!({ "reports": reports }))?;
            }

            if failures > 0 {
                anyhow::bail!("{} tenant(s) did not provision cleanly", failures);
            }
            Ok(())
        }
        TenantCommands::Register { slug, name, owner } => {
            let slug = TenantSlug::parse(slug)?;
            let tenant = state
                .registry
                .register(NewTenant {
                    name: name.unwrap_or_else(|| slug.to_string()),
                    slug,
                    owner_id: owner,
                })
                .await?;

            output_success(
                output_format,
                &format!("Tenant '{}' registered", tenant.slug),
                Some(&tenant),
            )
        }
        TenantCommands::List => {
            let tenants = state.registry.list().await?;
            if tenants.is_empty() {
                return output_empty_collection(output_format, "tenants", "No tenants registered");
            }

            match output_format {
                OutputFormat::Json => output_json(&json!({ "tenants": tenants })),
                OutputFormat::Text => {
                    println!("{:<24} {:<10} {:<24} {}", "SLUG", "STATUS", "NAME", "CREATED");
                    println!("{}", "-".repeat(80));
                    for tenant in &tenants {
                        print_tenant_row(tenant);
                    }
                    Ok(())
                }
            }
        }
        TenantCommands::Suspend { slug } => set_status(state, &slug, TenantStatus::Suspended, output_format).await,
        TenantCommands::Activate { slug } => set_status(state, &slug, TenantStatus::Active, output_format).await,
        TenantCommands::Rename { slug, new_slug } => {
            let slug = TenantSlug::parse(slug)?;
            let tenant = state.registry.change_slug(&slug, TenantSlug::parse(new_slug)?).await?;

            output_success(
                output_format,
                &format!("Tenant '{}' is now '{}'", slug, tenant.slug),
                Some(&tenant),
            )
        }
    }
}

async fn set_status(
    state: &AppState,
    slug: &str,
    status: TenantStatus,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let tenant = state.registry.set_status(&TenantSlug::parse(slug)?, status).await?;
    output_success(
        output_format,
        &format!("Tenant '{}' is {}", tenant.slug, status.as_str()),
        Some(&tenant),
    )
}

fn print_tenant_row(tenant: &TenantRecord) {
    println!(
        "{:<24} {:<10} {:<24} {}",
        tenant.slug,
        tenant.status.as_str(),
        tenant.name,
        tenant.created_at.format("%Y-%m-%d %H:%M")
    );
}

fn print_report(report: &ProvisionReport, output_format: OutputFormat) -> anyhow::Result<()> {
    if output_format == OutputFormat::Json {
        return output_json(report);
    }

    println!("Tenant: {}", report.slug);
    println!("Declarations: {}", report.declaration_version);
    for table in &report.created {
        println!("  created  {}", table);
    }
    for table in &report.skipped {
        println!("  skipped  {}", table);
    }
    for failed in &report.failed {
        println!("  FAILED   {} ({})", failed.table, failed.reason);
    }
    for join in &report.join_tables_required {
        println!(
            "  note     {}.{}: join table required ({})",
            join.table,
            join.attribute,
            join.cardinality.as_str()
        );
    }
    for warning in &report.warnings {
        println!("  warning  {}: {}", warning.table, warning.warning);
    }

    if report.is_success() {
        println!(
            "✓ {} table(s) created in {}",
            report.created.len(),
            report.database_path.display()
        );
    }
    Ok(())
}
