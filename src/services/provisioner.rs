use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use super::error::TenantError;
use super::events::{TenantEvent, TenantEventListener};
use crate::database::models::TenantRecord;
use crate::database::repository::table_exists;
use crate::database::{DatabaseError, DatabaseManager};
use crate::schema::{
    DeclarationSet, DeclarationSource, DeferredRelation, RelationCardinality, SchemaSynthesizer, SchemaWarning,
    TableSpec,
};
use crate::types::TenantSlug;

/// Extension point for relations that need a join table. Returned
/// statements run in the transaction that creates the owning table.
pub trait JoinTablePlanner: Send + Sync {
    fn plan(&self, owner: &TableSpec, relation: &DeferredRelation) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTable {
    pub table: String,
    pub content_type: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinTableRequirement {
    pub table: String,
    pub attribute: String,
    pub cardinality: RelationCardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// A join table planner supplied DDL for this relation
    pub planned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableWarning {
    pub table: String,
    #[serde(flatten)]
    pub warning: SchemaWarning,
}

/// Outcome of one provisioning run against one tenant database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub slug: TenantSlug,
    pub database_path: PathBuf,
    pub declaration_version: String,
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedTable>,
    pub join_tables_required: Vec<JoinTableRequirement>,
    pub warnings: Vec<TableWarning>,
}

impl ProvisionReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turn a report with failed tables into `ProvisioningPartialFailure`
    pub fn into_result(self) -> Result<Self, TenantError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TenantError::ProvisioningPartialFailure {
                slug: self.slug,
                failed: self.failed.into_iter().map(|f| f.table).collect(),
            })
        }
    }
}

enum TableOutcome {
    Created,
    Skipped,
}

/// Creates missing content-type tables in tenant databases.
///
/// Existing tables are skipped, never altered. Each table is created in its
/// own transaction, so one failing type does not stop the others.
pub struct TenantProvisioner {
    databases: Arc<DatabaseManager>,
    source: Arc<dyn DeclarationSource>,
    synthesizer: SchemaSynthesizer,
    join_tables: Option<Arc<dyn JoinTablePlanner>>,
    locks: Mutex<HashMap<TenantSlug, Arc<tokio::sync::Mutex<()>>>>,
}

impl TenantProvisioner {
    pub fn new(
        databases: Arc<DatabaseManager>,
        source: Arc<dyn DeclarationSource>,
        synthesizer: SchemaSynthesizer,
    ) -> Self {
        Self {
            databases,
            source,
            synthesizer,
            join_tables: None,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_join_table_planner(mut self, planner: Arc<dyn JoinTablePlanner>) -> Self {
        self.join_tables = Some(planner);
        self
    }

    pub fn synthesizer(&self) -> &SchemaSynthesizer {
        &self.synthesizer
    }

    pub fn source(&self) -> &Arc<dyn DeclarationSource> {
        &self.source
    }

    /// Table specs for every provisioned content type in `declarations`
    pub fn plan(&self, declarations: &DeclarationSet) -> Vec<TableSpec> {
        let resolve = |identifier: &str| declarations.physical_table(identifier);
        declarations
            .iter()
            .filter(|decl| self.synthesizer.families().is_provisioned(&decl.identifier))
            .map(|decl| self.synthesizer.synthesize(decl, &resolve))
            .collect()
    }

    /// Table spec of one provisioned content type, named by identifier or
    /// physical table name
    pub fn table_for(&self, declarations: &DeclarationSet, name: &str) -> Option<TableSpec> {
        let decl = declarations
            .find(name)
            .filter(|decl| self.synthesizer.families().is_provisioned(&decl.identifier))?;
        Some(
            self.synthesizer
                .synthesize(decl, &|identifier| declarations.physical_table(identifier)),
        )
    }

    /// Provision `slug` against the current declarations of the source
    pub async fn provision_current(&self, slug: &TenantSlug) -> Result<ProvisionReport, TenantError> {
        let declarations = self.source.list_declarations().await?;
        self.provision(slug, &declarations).await
    }

    pub async fn provision(
        &self,
        slug: &TenantSlug,
        declarations: &DeclarationSet,
    ) -> Result<ProvisionReport, TenantError> {
        let lock = self.lock_for(slug);
        let _held = lock.lock().await;

        let database_path = self.databases.ensure_tenant_database(slug).await?;
        let pool = self.databases.tenant_pool(slug).await?;

        let mut report = ProvisionReport {
            slug: slug.clone(),
            database_path,
            declaration_version: declarations.version(),
            created: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            join_tables_required: Vec::new(),
            warnings: Vec::new(),
        };

        for table in self.plan(declarations) {
            for warning in &table.warnings {
                warn!("Tenant '{}', table '{}': {}", slug, table.name, warning);
                report.warnings.push(TableWarning {
                    table: table.name.clone(),
                    warning: warning.clone(),
                });
            }

            for relation in &table.deferred_relations {
                report.join_tables_required.push(JoinTableRequirement {
                    table: table.name.clone(),
                    attribute: relation.attribute.clone(),
                    cardinality: relation.cardinality,
                    target: relation.target.clone(),
                    planned: self.join_tables.is_some(),
                });
            }

            match self.create_table(&pool, &table).await {
                Ok(TableOutcome::Created) => report.created.push(table.name),
                Ok(TableOutcome::Skipped) => report.skipped.push(table.name),
                Err(e) => {
                    error!("Failed to create table '{}' for tenant '{}': {}", table.name, slug, e);
                    report.failed.push(FailedTable {
                        table: table.name,
                        content_type: table.content_type,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Provisioned tenant '{}': {} created, {} skipped, {} failed",
            slug,
            report.created.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Provision every tenant in `tenants` concurrently against one snapshot
    /// of the declarations
    pub async fn backfill(
        &self,
        tenants: &[TenantRecord],
    ) -> Result<Vec<(TenantSlug, Result<ProvisionReport, TenantError>)>, TenantError> {
        let declarations = self.source.list_declarations().await?;

        let runs = tenants.iter().map(|tenant| {
            let declarations = &declarations;
            async move {
                let result = self.provision(&tenant.slug, declarations).await;
                (tenant.slug.clone(), result)
            }
        });

        Ok(join_all(runs).await)
    }

    async fn create_table(&self, pool: &SqlitePool, table: &TableSpec) -> Result<TableOutcome, DatabaseError> {
        let mut tx = pool.begin().await?;

        if table_exists(&mut *tx, &table.name).await? {
            return Ok(TableOutcome::Skipped);
        }

        sqlx::query(&table.create_table_sql()).execute(&mut *tx).await?;

        if let Some(planner) = &self.join_tables {
            for relation in &table.deferred_relations {
                for statement in planner.plan(table, relation) {
                    sqlx::query(&statement).execute(&mut *tx).await?;
                }
            }
        }

        tx.commit().await?;
        Ok(TableOutcome::Created)
    }

    fn lock_for(&self, slug: &TenantSlug) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(slug.clone()).or_default())
    }
}

#[async_trait]
impl TenantEventListener for TenantProvisioner {
    async fn on_tenant_event(&self, event: &TenantEvent) -> Result<(), TenantError> {
        let report = self.provision_current(&event.tenant().slug).await?;
        report.into_result().map(|_| ())
    }
}
