use std::sync::Arc;
use tracing::warn;

use super::error::TenantError;
use super::tenant_registry::TenantRegistry;
use crate::auth::AuthUser;
use crate::database::models::TenantRecord;
use crate::types::TenantSlug;

/// Determines which tenant a request belongs to.
///
/// The principal's tenant relation wins over the routing header. The
/// resolver never rejects a request for lacking a tenant; routes decide
/// whether "none" is acceptable.
#[derive(Clone)]
pub struct TenantResolver {
    registry: Arc<TenantRegistry>,
}

impl TenantResolver {
    pub fn new(registry: Arc<TenantRegistry>) -> Self {
        Self { registry }
    }

    pub async fn resolve(
        &self,
        principal: Option<&AuthUser>,
        header: Option<&str>,
    ) -> Result<Option<TenantRecord>, TenantError> {
        let candidate = principal
            .and_then(|p| p.tenant.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| header.map(str::trim).filter(|s| !s.is_empty()));

        let Some(candidate) = candidate else {
            return Ok(None);
        };

        // A malformed slug cannot name any tenant
        let slug = TenantSlug::parse(candidate).map_err(|_| TenantError::NotFound(candidate.to_string()))?;

        match self.registry.lookup_by_slug(&slug).await? {
            Some(tenant) if tenant.is_active() => Ok(Some(tenant)),
            Some(_) => {
                warn!("Rejected request for suspended tenant: {}", slug);
                Err(TenantError::NotFound(slug.to_string()))
            }
            None => {
                warn!("Rejected request for unknown tenant: {}", slug);
                Err(TenantError::NotFound(slug.to_string()))
            }
        }
    }
}
