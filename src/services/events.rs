// Tenant lifecycle events, delivered after the registry mutation commits

use async_trait::async_trait;

use super::error::TenantError;
use crate::database::models::TenantRecord;
use crate::types::TenantSlug;

#[derive(Debug, Clone, PartialEq)]
pub enum TenantEvent {
    Registered(TenantRecord),
    SlugChanged { tenant: TenantRecord, previous: TenantSlug },
}

impl TenantEvent {
    pub fn tenant(&self) -> &TenantRecord {
        match self {
            TenantEvent::Registered(tenant) => tenant,
            TenantEvent::SlugChanged { tenant, .. } => tenant,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TenantEvent::Registered(_) => "registered",
            TenantEvent::SlugChanged { .. } => "slug_changed",
        }
    }
}

#[async_trait]
pub trait TenantEventListener: Send + Sync {
    async fn on_tenant_event(&self, event: &TenantEvent) -> Result<(), TenantError>;
}
