use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::config::AppConfig;
use crate::database::models::TenantRecord;
use crate::database::DatabaseManager;
use crate::schema::{AttributeKind, ContentTypeDeclaration, SchemaSynthesizer, StaticDeclarationSource};
use crate::services::{NewTenant, TenantProvisioner, TenantRegistry, TenantResolver};
use crate::types::TenantSlug;

/// Isolated data root with a registry, resolver and provisioner wired the
/// way the server wires them. Dropping the context removes every database.
pub struct TestContext {
    pub config: AppConfig,
    pub databases: Arc<DatabaseManager>,
    pub provisioner: Arc<TenantProvisioner>,
    pub registry: Arc<TenantRegistry>,
    pub resolver: TenantResolver,
    _data_root: TempDir,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_declarations(vec![ContentTypeDeclaration::new("blog")
            .with_attribute("title", AttributeKind::ShortText)
            .with_attribute("views", AttributeKind::Integer)])
        .await
    }

    pub async fn with_declarations(declarations: Vec<ContentTypeDeclaration>) -> anyhow::Result<Self> {
        let data_root = tempfile::tempdir()?;
        let config = AppConfig::for_data_root(data_root.path());
        let databases = Arc::new(DatabaseManager::new(config.database.clone()));

        let source = Arc::new(StaticDeclarationSource::new(declarations)?);
        let provisioner = Arc::new(TenantProvisioner::new(
            databases.clone(),
            source,
            SchemaSynthesizer::default(),
        ));
        let registry = Arc::new(
            TenantRegistry::new(databases.clone(), Duration::ZERO).with_listener(provisioner.clone()),
        );
        let resolver = TenantResolver::new(registry.clone());

        Ok(Self {
            config,
            databases,
            provisioner,
            registry,
            resolver,
            _data_root: data_root,
        })
    }

    /// Register and provision a tenant
    pub async fn create_tenant(&self, slug: &str) -> anyhow::Result<TenantRecord> {
        let record = self.registry.register(NewTenant::new(TenantSlug::parse(slug)?)).await?;
        Ok(record)
    }

    /// Register a tenant without provisioning its database
    pub async fn register_only(&self, slug: &str) -> anyhow::Result<TenantRecord> {
        let bare = TenantRegistry::new(self.databases.clone(), Duration::ZERO);
        let record = bare.register(NewTenant::new(TenantSlug::parse(slug)?)).await?;
        Ok(record)
    }
}
