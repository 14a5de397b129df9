/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Routing slug of a tenant. Names the tenant's physical database file, so the
/// accepted alphabet is deliberately narrow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantSlug(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid tenant slug '{slug}': {reason}")]
pub struct InvalidSlug {
    pub slug: String,
    pub reason: &'static str,
}

impl TenantSlug {
    pub const MIN_LEN: usize = 2;
    pub const MAX_LEN: usize = 63;

    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidSlug> {
        let slug = value.into();
        let invalid = |reason| InvalidSlug { slug: slug.clone(), reason };

        if slug.len() < Self::MIN_LEN {
            return Err(invalid("must be at least 2 characters"));
        }
        if slug.len() > Self::MAX_LEN {
            return Err(invalid("must be at most 63 characters"));
        }
        if !slug.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return Err(invalid("must start with a lowercase letter or digit"));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(invalid("may only contain lowercase letters, digits, '-' and '_'"));
        }

        Ok(Self(slug))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantSlug {
    type Error = InvalidSlug;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TenantSlug> for String {
    fn from(slug: TenantSlug) -> Self {
        slug.0
    }
}

/// Lifecycle state of a tenant record. Only active tenants can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(TenantStatus::Active),
            "suspended" => Some(TenantStatus::Suspended),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_slugs() {
        assert_eq!(TenantSlug::parse("acme").unwrap().as_str(), "acme");
        assert!(TenantSlug::parse("acme-eu_2").is_ok());
        assert!(TenantSlug::parse("42north").is_ok());
    }

    #[test]
    fn rejects_path_like_and_malformed_slugs() {
        assert!(TenantSlug::parse("a").is_err());
        assert!(TenantSlug::parse("../etc").is_err());
        assert!(TenantSlug::parse("Acme").is_err());
        assert!(TenantSlug::parse("-acme").is_err());
        assert!(TenantSlug::parse("acme.db").is_err());
        assert!(TenantSlug::parse("a".repeat(64)).is_err());
    }

    #[test]
    fn slug_deserializes_with_validation() {
        let ok: TenantSlug = serde_json::from_str("\"acme\"").unwrap();
        assert_eq!(ok.as_str(), "acme");
        assert!(serde_json::from_str::<TenantSlug>("\"no/slashes\"").is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        assert_eq!(TenantStatus::parse("active"), Some(TenantStatus::Active));
        assert_eq!(TenantStatus::parse(TenantStatus::Suspended.as_str()), Some(TenantStatus::Suspended));
        assert_eq!(TenantStatus::parse("deleted"), None);
    }
}
