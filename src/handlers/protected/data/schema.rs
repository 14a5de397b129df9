// handlers/protected/data/schema.rs - GET/POST /api/data/:type

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::app::AppState;
use crate::database::{Record, Repository};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, RequiredTenant};
use crate::schema::TableSpec;

const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// GET /api/data/:type - List records of a content type
pub async fn get(
    State(state): State<AppState>,
    RequiredTenant { tenant, db }: RequiredTenant,
    Path(content_type): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Map<String, Value>>> {
    let table = table_spec(&state, &content_type).await?;
    let repo = Repository::new(&table, db.pool());

    if !repo.exists().await? {
        return Err(ApiError::not_found(format!(
            "Table '{}' is not provisioned for tenant '{}'",
            table.name, tenant.slug
        )));
    }

    let max = state.config.api.max_page_size.max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, max);
    let rows = repo.select_page(limit, query.offset.unwrap_or(0)).await?;

    Ok(ApiResponse::success(rows))
}

/// POST /api/data/:type - Insert one record; only declared columns accepted
pub async fn post(
    State(state): State<AppState>,
    RequiredTenant { tenant, db }: RequiredTenant,
    Path(content_type): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Map<String, Value>> {
    let Json(body) = body.map_err(|e| ApiError::invalid_json(e.body_text()))?;

    let table = table_spec(&state, &content_type).await?;
    let record = Record::from_api_input(body, &table)?;
    let repo = Repository::new(&table, db.pool());

    if !repo.exists().await? {
        return Err(ApiError::not_found(format!(
            "Table '{}' is not provisioned for tenant '{}'",
            table.name, tenant.slug
        )));
    }

    let row = repo.insert(&record).await?;
    tracing::info!("Inserted record into '{}' for tenant '{}'", table.name, tenant.slug);

    Ok(ApiResponse::created(row))
}

async fn table_spec(state: &AppState, content_type: &str) -> Result<TableSpec, ApiError> {
    let declarations = state.provisioner.source().list_declarations().await?;
    state
        .provisioner
        .table_for(&declarations, content_type)
        .ok_or_else(|| ApiError::not_found(format!("Unknown content type '{}'", content_type)))
}
