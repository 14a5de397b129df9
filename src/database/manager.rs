use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OnceCell, RwLock};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::types::TenantSlug;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid tenant database name: {0}")]
    InvalidTenantName(String),

    #[error("Tenant database does not exist: {}", .0.display())]
    MissingDatabase(PathBuf),

    #[error("Failed to prepare data directory {}: {source}", .path.display())]
    DataRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Connection pool manager for the registry database and one SQLite database
/// per tenant. Pools are created lazily and keyed by slug; concurrent first
/// access to one tenant waits only on that tenant's pool.
pub struct DatabaseManager {
    config: DatabaseConfig,
    registry: OnceCell<SqlitePool>,
    pools: RwLock<HashMap<TenantSlug, Arc<OnceCell<SqlitePool>>>>,
    #[cfg(test)]
    open_delay: Duration,
}

impl DatabaseManager {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            registry: OnceCell::new(),
            pools: RwLock::new(HashMap::new()),
            #[cfg(test)]
            open_delay: Duration::ZERO,
        }
    }

    /// Stall every tenant pool creation by `delay`
    #[cfg(test)]
    pub(crate) fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn data_root(&self) -> &Path {
        &self.config.data_root
    }

    pub fn registry_name(&self) -> &str {
        &self.config.registry_name
    }

    /// Location of the registry database, `<data_root>/<registry_name>.db`
    pub fn registry_path(&self) -> PathBuf {
        self.config
            .data_root
            .join(format!("{}.db", self.config.registry_name))
    }

    /// Location of a tenant database, `<data_root>/<slug>.db`
    pub fn tenant_database_path(&self, slug: &TenantSlug) -> Result<PathBuf, DatabaseError> {
        if slug.as_str() == self.config.registry_name {
            return Err(DatabaseError::InvalidTenantName(slug.to_string()));
        }
        Ok(self.config.data_root.join(format!("{}.db", slug)))
    }

    /// Registry pool; also the default binding for requests without a tenant
    pub async fn registry_pool(&self) -> Result<SqlitePool, DatabaseError> {
        self.registry
            .get_or_try_init(|| async {
                self.ensure_data_root().await?;
                let options = self.connect_options(&self.registry_path()).create_if_missing(true);
                let pool = self.pool_options().connect_with(options).await?;
                info!("Created registry database pool: {}", self.registry_path().display());
                Ok::<_, DatabaseError>(pool)
            })
            .await
            .cloned()
    }

    /// Create the tenant database file if it does not exist yet. SQLite opens
    /// with O_CREAT, so concurrent callers for one slug converge on one file.
    pub async fn ensure_tenant_database(&self, slug: &TenantSlug) -> Result<PathBuf, DatabaseError> {
        let path = self.tenant_database_path(slug)?;
        self.ensure_data_root().await?;

        let connection = self.connect_options(&path).create_if_missing(true).connect().await?;
        connection.close().await?;

        Ok(path)
    }

    /// Pool for an existing tenant database. Never creates the database; a
    /// failure here leaves no cached state behind, so the next call retries.
    pub async fn tenant_pool(&self, slug: &TenantSlug) -> Result<SqlitePool, DatabaseError> {
        let path = self.tenant_database_path(slug)?;
        let cell = self.pool_cell(slug).await;

        cell.get_or_try_init(|| async {
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(DatabaseError::MissingDatabase(path.clone()));
            }
            #[cfg(test)]
            tokio::time::sleep(self.open_delay).await;
            let pool = self.pool_options().connect_with(self.connect_options(&path)).await?;
            info!("Created database pool for tenant: {}", slug);
            Ok::<_, DatabaseError>(pool)
        })
        .await
        .cloned()
    }

    async fn pool_cell(&self, slug: &TenantSlug) -> Arc<OnceCell<SqlitePool>> {
        // Fast path: try read lock
        {
            let pools = self.pools.read().await;
            if let Some(cell) = pools.get(slug) {
                return Arc::clone(cell);
            }
        }

        let mut pools = self.pools.write().await;
        Arc::clone(pools.entry(slug.clone()).or_default())
    }

    /// Pings the registry pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        let pool = self.registry_pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Close and remove all pools (e.g., on shutdown)
    pub async fn close_all(&self) {
        let mut pools = self.pools.write().await;
        for (slug, cell) in pools.drain() {
            if let Some(pool) = cell.get() {
                pool.close().await;
                info!("Closed database pool: {}", slug);
            }
        }
        if let Some(pool) = self.registry.get() {
            pool.close().await;
            info!("Closed registry database pool");
        }
    }

    async fn ensure_data_root(&self) -> Result<(), DatabaseError> {
        tokio::fs::create_dir_all(&self.config.data_root)
            .await
            .map_err(|source| DatabaseError::DataRoot {
                path: self.config.data_root.clone(),
                source,
            })
    }

    fn connect_options(&self, path: &Path) -> SqliteConnectOptions {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))
            .foreign_keys(true);

        if self.config.enable_query_logging {
            options
        } else {
            options.disable_statement_logging()
        }
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        SqlitePoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(Duration::from_secs(self.config.connection_timeout))
    }
}
