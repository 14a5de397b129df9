// handlers/elevated/root/tenant/create.rs - POST /api/root/tenant
//
// Registers the tenant; the provisioner reacts to the registration event and
// creates the tenant database.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::parse_slug;
use crate::app::AppState;
use crate::database::models::TenantRecord;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, RootUser};
use crate::services::NewTenant;

#[derive(Debug, Deserialize)]
pub struct CreateTenant {
    pub slug: String,
    pub name: Option<String>,
    pub owner_id: Option<Uuid>,
}

pub async fn tenant_create(
    State(state): State<AppState>,
    RootUser(root): RootUser,
    body: Result<Json<CreateTenant>, JsonRejection>,
) -> ApiResult<TenantRecord> {
    let Json(input) = body.map_err(|e| ApiError::invalid_json(e.body_text()))?;
    let slug = parse_slug(&input.slug)?;

    let tenant = state
        .registry
        .register(NewTenant {
            name: input.name.unwrap_or_else(|| slug.to_string()),
            slug,
            owner_id: input.owner_id,
        })
        .await?;

    tracing::info!("Tenant '{}' created by '{}'", tenant.slug, root.user);
    Ok(ApiResponse::created(tenant))
}
