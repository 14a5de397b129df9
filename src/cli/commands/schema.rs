use clap::Subcommand;
use serde_json::json;

use crate::app::AppState;
use crate::cli::utils::{output_empty_collection, output_json};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum SchemaCommands {
    #[command(about = "Print the synthesized table DDL for content types")]
    Show {
        #[arg(help = "Content-type identifier or table name (all when omitted)")]
        identifier: Option<String>,
    },
}

pub async fn handle(cmd: SchemaCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SchemaCommands::Show { identifier } => {
            let declarations = state.provisioner.source().list_declarations().await?;

            let tables = match identifier {
                Some(name) => vec![state
                    .provisioner
                    .table_for(&declarations, &name)
                    .ok_or_else(|| anyhow::anyhow!("Content type '{}' not found or not provisioned", name))?],
                None => state.provisioner.plan(&declarations),
            };

            if tables.is_empty() {
                return output_empty_collection(output_format, "tables", "No provisioned content types declared");
            }

            match output_format {
                OutputFormat::Json => {
                    let tables: Vec<_> = tables
                        .iter()
                        .map(|table| json!({ "table": table, "sql": table.create_table_sql() }))
                        .collect();
                    output_json(&json!({
                        "declaration_version": declarations.version(),
                        "tables": tables
                    }))?;
                }
                OutputFormat::Text => {
                    println!("-- declaration version {}", declarations.version());
                    for table in &tables {
                        println!("\n-- {}", table.content_type);
                        for warning in &table.warnings {
                            println!("-- warning: {}", warning);
                        }
                        for relation in &table.deferred_relations {
                            println!(
                                "-- join table required: {} ({})",
                                relation.attribute,
                                relation.cardinality.as_str()
                            );
                        }
                        println!("{};", table.create_table_sql());
                    }
                }
            }
            Ok(())
        }
    }
}
