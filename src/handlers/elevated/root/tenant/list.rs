// handlers/elevated/root/tenant/list.rs - GET /api/root/tenant

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::TenantRecord;
use crate::middleware::{ApiResponse, ApiResult, RootUser};

pub async fn tenant_list(State(state): State<AppState>, _root: RootUser) -> ApiResult<Vec<TenantRecord>> {
    let tenants = state.registry.list().await?;
    Ok(ApiResponse::success(tenants))
}
