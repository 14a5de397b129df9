use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{TenantSlug, TenantStatus};

/// Tenant as stored in the registry database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: TenantSlug,
    pub status: TenantStatus,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantRecord {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// Raw registry row; ids and enums are stored as text
#[derive(Debug, FromRow)]
pub(crate) struct TenantRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub status: String,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for TenantRecord {
    type Error = String;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id).map_err(|e| format!("invalid tenant id '{}': {}", row.id, e))?;
        let slug = TenantSlug::parse(row.slug).map_err(|e| e.to_string())?;
        let status = TenantStatus::parse(&row.status)
            .ok_or_else(|| format!("invalid tenant status '{}'", row.status))?;
        let owner_id = row
            .owner_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| format!("invalid owner id: {}", e))?;

        Ok(Self {
            id,
            name: row.name,
            slug,
            status,
            owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
