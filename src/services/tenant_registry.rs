use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OnceCell, RwLock};
use tracing::{error, info};
use uuid::Uuid;

use super::error::TenantError;
use super::events::{TenantEvent, TenantEventListener};
use crate::database::models::tenant::{TenantRecord, TenantRow};
use crate::database::DatabaseManager;
use crate::types::{InvalidSlug, TenantSlug, TenantStatus};

const CREATE_TENANTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS tenants (
        id TEXT NOT NULL PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL DEFAULT 'active',
        owner_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const SELECT_TENANT: &str =
    "SELECT id, name, slug, status, owner_id, created_at, updated_at FROM tenants";

/// Input for registering a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTenant {
    pub name: String,
    pub slug: TenantSlug,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
}

impl NewTenant {
    pub fn new(slug: TenantSlug) -> Self {
        Self {
            name: slug.to_string(),
            slug,
            owner_id: None,
        }
    }
}

/// Upper bound on cached slug lookups, hits and misses together
const MAX_CACHED_LOOKUPS: usize = 1024;

struct CachedLookup {
    record: Option<TenantRecord>,
    fetched_at: Instant,
}

/// Lookup cache. `generation` moves on every invalidation so a lookup that
/// raced a mutation never stores what it read before the mutation.
#[derive(Default)]
struct LookupCache {
    generation: u64,
    entries: HashMap<TenantSlug, CachedLookup>,
}

/// Registry of known tenants, stored in the well-known registry database.
///
/// Slug lookups sit on the request path, so they go through a short TTL
/// cache. Every mutation made through the registry clears it. The cache is
/// bounded and drops expired entries whenever it stores a new one.
pub struct TenantRegistry {
    databases: Arc<DatabaseManager>,
    cache_ttl: Duration,
    cache: RwLock<LookupCache>,
    schema: OnceCell<()>,
    listeners: Vec<Arc<dyn TenantEventListener>>,
}

impl TenantRegistry {
    pub fn new(databases: Arc<DatabaseManager>, cache_ttl: Duration) -> Self {
        Self {
            databases,
            cache_ttl,
            cache: RwLock::new(LookupCache::default()),
            schema: OnceCell::new(),
            listeners: Vec::new(),
        }
    }

    /// Deliver lifecycle events to `listener` after each committed mutation
    pub fn with_listener(mut self, listener: Arc<dyn TenantEventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    async fn pool(&self) -> Result<SqlitePool, TenantError> {
        let pool = self.databases.registry_pool().await?;
        self.schema
            .get_or_try_init(|| async {
                sqlx::query(CREATE_TENANTS_TABLE).execute(&pool).await?;
                Ok::<_, TenantError>(())
            })
            .await?;
        Ok(pool)
    }

    /// Register a tenant; fails with `DuplicateSlug` when the slug is taken
    pub async fn register(&self, tenant: NewTenant) -> Result<TenantRecord, TenantError> {
        if tenant.slug.as_str() == self.databases.registry_name() {
            return Err(InvalidSlug {
                slug: tenant.slug.to_string(),
                reason: "is reserved for the registry database",
            }
            .into());
        }

        let pool = self.pool().await?;
        let now = Utc::now();
        let record = TenantRecord {
            id: Uuid::new_v4(),
            name: tenant.name,
            slug: tenant.slug,
            status: TenantStatus::Active,
            owner_id: tenant.owner_id,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO tenants (id, name, slug, status, owner_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.name)
        .bind(record.slug.as_str())
        .bind(record.status.as_str())
        .bind(record.owner_id.map(|id| id.to_string()))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&pool)
        .await
        .map_err(|e| unique_violation(e, &record.slug))?;

        self.invalidate().await;
        info!("Registered tenant '{}' ({})", record.slug, record.id);

        self.emit(TenantEvent::Registered(record.clone())).await;
        Ok(record)
    }

    /// Hot-path lookup, served from the cache while fresh
    pub async fn lookup_by_slug(&self, slug: &TenantSlug) -> Result<Option<TenantRecord>, TenantError> {
        let generation = {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.entries.get(slug) {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(entry.record.clone());
                }
            }
            cache.generation
        };

        let record = self.fetch(slug).await?;
        self.remember(slug, &record, generation).await;
        Ok(record)
    }

    /// Cache a lookup made at `generation`; dropped if a mutation happened since
    async fn remember(&self, slug: &TenantSlug, record: &Option<TenantRecord>, generation: u64) {
        if self.cache_ttl.is_zero() {
            return;
        }

        let mut cache = self.cache.write().await;
        if cache.generation != generation {
            return;
        }

        let ttl = self.cache_ttl;
        cache.entries.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        if cache.entries.len() >= MAX_CACHED_LOOKUPS {
            // Known tenants are worth more than misses
            cache.entries.retain(|_, entry| entry.record.is_some());
            if cache.entries.len() >= MAX_CACHED_LOOKUPS {
                return;
            }
        }

        cache.entries.insert(
            slug.clone(),
            CachedLookup {
                record: record.clone(),
                fetched_at: Instant::now(),
            },
        );
    }

    /// Like `lookup_by_slug`, but a missing tenant is an error
    pub async fn get(&self, slug: &TenantSlug) -> Result<TenantRecord, TenantError> {
        self.lookup_by_slug(slug)
            .await?
            .ok_or_else(|| TenantError::NotFound(slug.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<TenantRecord>, TenantError> {
        let pool = self.pool().await?;
        let rows: Vec<TenantRow> = sqlx::query_as(&format!("{} ORDER BY slug", SELECT_TENANT))
            .fetch_all(&pool)
            .await?;

        rows.into_iter()
            .map(|row| TenantRecord::try_from(row).map_err(TenantError::Corrupt))
            .collect()
    }

    /// Activate or suspend a tenant. Suspended tenants no longer resolve.
    pub async fn set_status(&self, slug: &TenantSlug, status: TenantStatus) -> Result<TenantRecord, TenantError> {
        let pool = self.pool().await?;
        let result = sqlx::query("UPDATE tenants SET status = ?, updated_at = ? WHERE slug = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(slug.as_str())
            .execute(&pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(TenantError::NotFound(slug.to_string()));
        }

        self.invalidate().await;
        info!("Tenant '{}' is now {}", slug, status.as_str());

        self.fetch(slug)
            .await?
            .ok_or_else(|| TenantError::NotFound(slug.to_string()))
    }

    /// Management-only slug change. The tenant's previous database stays
    /// where it is; listeners provision the database for the new slug.
    pub async fn change_slug(&self, slug: &TenantSlug, new_slug: TenantSlug) -> Result<TenantRecord, TenantError> {
        if new_slug.as_str() == self.databases.registry_name() {
            return Err(InvalidSlug {
                slug: new_slug.to_string(),
                reason: "is reserved for the registry database",
            }
            .into());
        }
        if &new_slug == slug {
            return self.get(slug).await;
        }

        let pool = self.pool().await?;
        let result = sqlx::query("UPDATE tenants SET slug = ?, updated_at = ? WHERE slug = ?")
            .bind(new_slug.as_str())
            .bind(Utc::now())
            .bind(slug.as_str())
            .execute(&pool)
            .await
            .map_err(|e| unique_violation(e, &new_slug))?;

        if result.rows_affected() == 0 {
            return Err(TenantError::NotFound(slug.to_string()));
        }

        self.invalidate().await;
        info!("Tenant slug changed: {} -> {}", slug, new_slug);

        let tenant = self
            .fetch(&new_slug)
            .await?
            .ok_or_else(|| TenantError::NotFound(new_slug.to_string()))?;

        self.emit(TenantEvent::SlugChanged {
            tenant: tenant.clone(),
            previous: slug.clone(),
        })
        .await;
        Ok(tenant)
    }

    async fn fetch(&self, slug: &TenantSlug) -> Result<Option<TenantRecord>, TenantError> {
        let pool = self.pool().await?;
        let row: Option<TenantRow> = sqlx::query_as(&format!("{} WHERE slug = ?", SELECT_TENANT))
            .bind(slug.as_str())
            .fetch_optional(&pool)
            .await?;

        row.map(TenantRecord::try_from)
            .transpose()
            .map_err(TenantError::Corrupt)
    }

    async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        cache.entries.clear();
        cache.generation += 1;
    }

    async fn emit(&self, event: TenantEvent) {
        for listener in &self.listeners {
            if let Err(e) = listener.on_tenant_event(&event).await {
                error!(
                    "Tenant event listener failed for '{}' ({}): {}",
                    event.tenant().slug,
                    event.name(),
                    e
                );
            }
        }
    }
}

fn unique_violation(err: sqlx::Error, slug: &TenantSlug) -> TenantError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => TenantError::DuplicateSlug(slug.clone()),
        _ => err.into(),
    }
}
