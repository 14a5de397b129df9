//! Request-scoped database routing.
//!
//! A request's tenant binding lives in a task-local scope around the handler
//! future (and in the request extensions), never in shared state. Each tenant
//! has its own pool in the [`DatabaseManager`], so concurrent requests for
//! different tenants never see each other's connections, and requests for the
//! same tenant share that tenant's pool.

use serde::Serialize;
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::manager::{DatabaseError, DatabaseManager};
use crate::database::models::tenant::TenantRecord;
use crate::types::TenantSlug;

tokio::task_local! {
    static BOUND_DATABASE: BoundDatabase;
}

/// Connection visible to one unit of work
#[derive(Clone, Debug)]
pub enum BoundDatabase {
    /// No tenant resolved; the registry (default) database
    Default(SqlitePool),
    Tenant { slug: TenantSlug, pool: SqlitePool },
}

impl BoundDatabase {
    pub fn pool(&self) -> &SqlitePool {
        match self {
            BoundDatabase::Default(pool) => pool,
            BoundDatabase::Tenant { pool, .. } => pool,
        }
    }

    pub fn tenant(&self) -> Option<&TenantSlug> {
        match self {
            BoundDatabase::Default(_) => None,
            BoundDatabase::Tenant { slug, .. } => Some(slug),
        }
    }

    pub fn describe(&self) -> BindingInfo {
        BindingInfo {
            tenant: self.tenant().map(|s| s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BindingInfo {
    pub tenant: Option<String>,
}

/// Marks the lifetime of one binding. Dropped on every exit path of the
/// handler: normal return, error, panic unwind, or the request future being
/// dropped on cancellation.
struct BindingGuard {
    tenant: Option<TenantSlug>,
}

impl BindingGuard {
    fn new(bound: &BoundDatabase) -> Self {
        let tenant = bound.tenant().cloned();
        match &tenant {
            Some(slug) => debug!("Bound request to tenant database: {}", slug),
            None => debug!("Bound request to default database"),
        }
        Self { tenant }
    }
}

impl Drop for BindingGuard {
    fn drop(&mut self) {
        // The binding ends with the task-local scope; nothing here can fail
        // back into the handler's result.
        match &self.tenant {
            Some(slug) => debug!("Released tenant database binding: {}", slug),
            None => debug!("Released default database binding"),
        }
    }
}

#[derive(Clone)]
pub struct DatabaseRouter {
    databases: Arc<DatabaseManager>,
}

impl DatabaseRouter {
    pub fn new(databases: Arc<DatabaseManager>) -> Self {
        Self { databases }
    }

    /// Acquire the binding for `tenant` without running anything
    pub async fn bind(&self, tenant: Option<&TenantRecord>) -> Result<BoundDatabase, DatabaseError> {
        match tenant {
            None => Ok(BoundDatabase::Default(self.databases.registry_pool().await?)),
            Some(record) => Ok(BoundDatabase::Tenant {
                slug: record.slug.clone(),
                pool: self.databases.tenant_pool(&record.slug).await?,
            }),
        }
    }

    /// Run `handler` with the connection for `tenant` (or the default one)
    /// bound for exactly the handler's duration. Acquisition failures are
    /// returned before the handler runs; the handler's own output is passed
    /// through untouched.
    pub async fn with_tenant<F, Fut, T>(
        &self,
        tenant: Option<&TenantRecord>,
        handler: F,
    ) -> Result<T, DatabaseError>
    where
        F: FnOnce(BoundDatabase) -> Fut,
        Fut: Future<Output = T>,
    {
        let bound = self.bind(tenant).await?;
        let _guard = BindingGuard::new(&bound);
        Ok(BOUND_DATABASE.scope(bound.clone(), handler(bound)).await)
    }

    /// Binding of the current unit of work, if it runs inside `with_tenant`
    pub fn current() -> Option<BoundDatabase> {
        BOUND_DATABASE.try_with(|bound| bound.clone()).ok()
    }
}
