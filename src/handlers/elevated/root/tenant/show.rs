// handlers/elevated/root/tenant/show.rs - GET /api/root/tenant/:slug

use axum::extract::{Path, State};

use super::parse_slug;
use crate::app::AppState;
use crate::database::models::TenantRecord;
use crate::middleware::{ApiResponse, ApiResult, RootUser};

pub async fn tenant_show(
    State(state): State<AppState>,
    _root: RootUser,
    Path(slug): Path<String>,
) -> ApiResult<TenantRecord> {
    let tenant = state.registry.get(&parse_slug(&slug)?).await?;
    Ok(ApiResponse::success(tenant))
}
