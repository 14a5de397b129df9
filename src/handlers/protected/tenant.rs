// handlers/protected/tenant.rs - GET /api/tenant

use serde::Serialize;

use crate::database::models::TenantRecord;
use crate::database::{BindingInfo, DatabaseRouter};
use crate::middleware::{ApiResponse, ApiResult, RequiredTenant};

#[derive(Debug, Serialize)]
pub struct CurrentTenant {
    pub tenant: TenantRecord,
    pub binding: BindingInfo,
}

/// GET /api/tenant - Tenant and database binding of this request
pub async fn current(RequiredTenant { tenant, db }: RequiredTenant) -> ApiResult<CurrentTenant> {
    // Handlers run inside the router's scope
    let binding = DatabaseRouter::current().unwrap_or(db).describe();
    Ok(ApiResponse::success(CurrentTenant { tenant, binding }))
}
