// handlers/elevated/root/tenant/mod.rs - Tenant management handlers
//
// These are the only request-path handlers that mutate the registry.

use crate::error::ApiError;
use crate::types::TenantSlug;

pub mod create; // POST /api/root/tenant
pub mod list; // GET /api/root/tenant
pub mod provision; // POST /api/root/tenant/:slug/provision
pub mod show; // GET /api/root/tenant/:slug
pub mod update; // PUT /api/root/tenant/:slug

pub use create::tenant_create;
pub use list::tenant_list;
pub use provision::tenant_provision;
pub use show::tenant_show;
pub use update::tenant_update;

fn parse_slug(value: &str) -> Result<TenantSlug, ApiError> {
    TenantSlug::parse(value).map_err(|e| ApiError::bad_request(e.to_string()))
}
