// handlers/elevated/root/tenant/update.rs - PUT /api/root/tenant/:slug
//
// Accepts `status` ("active" | "suspended") and/or a new `slug`. A slug
// change provisions the database for the new slug; the old database file is
// left in place.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;

use super::parse_slug;
use crate::app::AppState;
use crate::database::models::TenantRecord;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, RootUser};
use crate::types::TenantStatus;

#[derive(Debug, Deserialize)]
pub struct UpdateTenant {
    pub status: Option<TenantStatus>,
    pub slug: Option<String>,
}

pub async fn tenant_update(
    State(state): State<AppState>,
    _root: RootUser,
    Path(slug): Path<String>,
    body: Result<Json<UpdateTenant>, JsonRejection>,
) -> ApiResult<TenantRecord> {
    let Json(input) = body.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    let mut slug = parse_slug(&slug)?;

    if input.status.is_none() && input.slug.is_none() {
        return Err(ApiError::bad_request("Nothing to update: expected 'status' and/or 'slug'"));
    }

    let mut tenant = state.registry.get(&slug).await?;

    if let Some(new_slug) = input.slug {
        let new_slug = parse_slug(&new_slug)?;
        tenant = state.registry.change_slug(&slug, new_slug).await?;
        slug = tenant.slug.clone();
    }

    if let Some(status) = input.status {
        tenant = state.registry.set_status(&slug, status).await?;
    }

    Ok(ApiResponse::success(tenant))
}
