use crate::database::DatabaseError;
use crate::schema::DeclarationError;
use crate::types::{InvalidSlug, TenantSlug};

/// Tenant registry, resolution and provisioning failures
#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    /// A candidate slug did not resolve to a known, active tenant
    #[error("Tenant not found: {0}")]
    NotFound(String),

    /// No tenant resolved on a route that requires one
    #[error("No tenant could be resolved for this request")]
    Missing,

    #[error("Tenant slug already taken: {0}")]
    DuplicateSlug(TenantSlug),

    #[error(transparent)]
    InvalidSlug(#[from] InvalidSlug),

    #[error("Provisioning of tenant '{slug}' failed for {} table(s): {}", .failed.len(), .failed.join(", "))]
    ProvisioningPartialFailure { slug: TenantSlug, failed: Vec<String> },

    #[error("Corrupt registry row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Declarations(#[from] DeclarationError),
}

impl From<sqlx::Error> for TenantError {
    fn from(err: sqlx::Error) -> Self {
        TenantError::Database(DatabaseError::Sqlx(err))
    }
}
