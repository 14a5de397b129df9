// handlers/public/home.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - Service description
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Monk Tenancy",
            "version": version,
            "description": "Tenant data isolation: one database per tenant, provisioned from content-type declarations",
            "tenant_header": state.config.tenancy.header_name,
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "tenant": "/api/tenant (tenant required)",
                "data": "/api/data/:type (tenant required)",
                "root": "/api/root/tenant[/:slug[/provision]] (root access)",
            }
        }
    }))
}

/// GET /health - Registry connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.databases.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
