// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::{DatabaseError, RecordError};
use crate::schema::DeclarationError;
use crate::services::TenantError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),
    TenantMissing,

    // 404 Not Found
    NotFound(String),
    TenantNotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),
    PipelineMisconfigured(&'static str),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::TenantMissing => 403,
            ApiError::NotFound(_) => 404,
            ApiError::TenantNotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::PipelineMisconfigured(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::ValidationError { message, .. } => message.clone(),
            ApiError::InvalidJson(msg) => msg.clone(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Forbidden(msg) => msg.clone(),
            ApiError::TenantMissing => "This route requires a tenant".to_string(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::TenantNotFound(slug) => format!("Tenant '{}' not found", slug),
            ApiError::Conflict(msg) => msg.clone(),
            ApiError::InternalServerError(msg) => msg.clone(),
            ApiError::PipelineMisconfigured(stage) => format!("Pipeline misconfigured: {} did not run", stage),
            ApiError::ServiceUnavailable(msg) => msg.clone(),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            response["field_errors"] = json!(field_errors);
        }

        response
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::TenantMissing => "TENANT_MISSING",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::TenantNotFound(_) => "TENANT_NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::PipelineMisconfigured(_) => "PIPELINE_MISCONFIGURED",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::SystemFieldNotAllowed(field) => {
                ApiError::bad_request(format!("System field '{}' cannot be set via API", field))
            }
            RecordError::InvalidJson(msg) => ApiError::invalid_json(msg),
            RecordError::UnknownField { field, table } => {
                let mut field_errors = HashMap::new();
                field_errors.insert(field, format!("Not a column of '{}'", table));
                ApiError::validation_error("Unknown fields", Some(field_errors))
            }
            RecordError::InvalidValue { field, expected } => {
                let mut field_errors = HashMap::new();
                field_errors.insert(field, format!("Expected {}", expected));
                ApiError::validation_error("Invalid field format", Some(field_errors))
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::MissingDatabase(path) => {
                // Registered but never provisioned
                tracing::error!("Tenant database missing: {}", path.display());
                ApiError::service_unavailable("Tenant database is not provisioned")
            }
            DatabaseError::InvalidTenantName(name) => ApiError::bad_request(format!("Invalid tenant name: {}", name)),
            DatabaseError::DataRoot { .. } => {
                tracing::error!("Database error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) => {
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            // Constraint failures come from client input, not from the server
            DatabaseError::Sqlx(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                ApiError::validation_error("Referenced record does not exist", None)
            }
            DatabaseError::Sqlx(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                ApiError::conflict("Record conflicts with an existing record")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<DeclarationError> for ApiError {
    fn from(err: DeclarationError) -> Self {
        tracing::error!("Declaration source error: {}", err);
        ApiError::service_unavailable("Content-type declarations unavailable")
    }
}

impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::NotFound(slug) => ApiError::TenantNotFound(slug),
            TenantError::Missing => ApiError::TenantMissing,
            TenantError::DuplicateSlug(slug) => ApiError::conflict(format!("Tenant slug '{}' is already taken", slug)),
            TenantError::InvalidSlug(e) => ApiError::bad_request(e.to_string()),
            TenantError::ProvisioningPartialFailure { .. } => {
                tracing::error!("{}", err);
                ApiError::internal_server_error(err.to_string())
            }
            TenantError::Corrupt(msg) => {
                tracing::error!("Corrupt registry data: {}", msg);
                ApiError::internal_server_error("Tenant registry error")
            }
            TenantError::Database(e) => e.into(),
            TenantError::Declarations(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TenantSlug;

    #[test]
    fn tenant_taxonomy_maps_to_client_errors() {
        let cases: Vec<(TenantError, u16, &str)> = vec![
            (TenantError::NotFound("acme".into()), 404, "TENANT_NOT_FOUND"),
            (TenantError::Missing, 403, "TENANT_MISSING"),
            (
                TenantError::DuplicateSlug(TenantSlug::parse("acme").unwrap()),
                409,
                "CONFLICT",
            ),
            (
                TenantError::InvalidSlug(TenantSlug::parse("A").unwrap_err()),
                400,
                "BAD_REQUEST",
            ),
        ];

        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), status);
            assert_eq!(api.error_code(), code);
        }
    }

    #[test]
    fn storage_internals_are_not_exposed() {
        let api: ApiError = DatabaseError::Sqlx(sqlx::Error::Protocol("secret detail".into())).into();
        assert_eq!(api.status_code(), 500);
        assert!(!api.to_json().to_string().contains("secret detail"));
    }

    async fn constraint_error(sql: &str) -> DatabaseError {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap().foreign_keys(true);
        let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await.unwrap();
        sqlx::query("CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT UNIQUE)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE blogs (id INTEGER PRIMARY KEY, author_id INTEGER REFERENCES authors(id))")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO authors (name) VALUES ('ada')").execute(&pool).await.unwrap();

        sqlx::query(sql).execute(&pool).await.unwrap_err().into()
    }

    #[tokio::test]
    async fn constraint_violations_are_client_errors() {
        let dangling: ApiError = constraint_error("INSERT INTO blogs (author_id) VALUES (999)").await.into();
        assert_eq!(dangling.status_code(), 400);
        assert_eq!(dangling.error_code(), "VALIDATION_ERROR");

        let duplicate: ApiError = constraint_error("INSERT INTO authors (name) VALUES ('ada')").await.into();
        assert_eq!(duplicate.status_code(), 409);
        assert_eq!(duplicate.error_code(), "CONFLICT");
    }

    #[test]
    fn error_body_uses_envelope() {
        let body = ApiError::TenantMissing.to_json();
        assert_eq!(body["error"], json!(true));
        assert_eq!(body["code"], json!("TENANT_MISSING"));
    }
}
