//! Content-type declarations and the physical schema derived from them.
//!
//! Declarations come from a [`DeclarationSource`]; the [`SchemaSynthesizer`]
//! turns each one into a [`TableSpec`] using the attribute mapper. Nothing in
//! this module touches a database.

pub mod declaration;
pub mod mapper;
pub mod source;
pub mod synthesizer;

pub use declaration::{Attribute, AttributeKind, Attributes, ContentTypeDeclaration, RelationCardinality};
pub use mapper::{
    map_attribute, ColumnDefault, ColumnKind, ColumnSpec, DeferredRelation, ForeignKey, Mapping,
    MappingContext, SchemaWarning,
};
pub use source::{
    DeclarationError, DeclarationSet, DeclarationSource, FileDeclarationSource, StaticDeclarationSource,
};
pub use synthesizer::{quote_identifier, SchemaSynthesizer, TableSpec};

use crate::config::TenancyConfig;

/// Identifier prefixes that group content types into families
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFamilies {
    tenant_family: String,
    internal_families: Vec<String>,
}

impl TypeFamilies {
    pub fn new(tenant_family: impl Into<String>, internal_families: Vec<String>) -> Self {
        Self {
            tenant_family: tenant_family.into(),
            internal_families,
        }
    }

    pub fn from_config(config: &TenancyConfig) -> Self {
        Self::new(config.tenant_family.clone(), config.internal_families.clone())
    }

    /// The tenant type itself. Its records live in the registry.
    pub fn is_tenant_family(&self, identifier: &str) -> bool {
        !self.tenant_family.is_empty() && identifier.starts_with(&self.tenant_family)
    }

    pub fn is_internal(&self, identifier: &str) -> bool {
        self.internal_families
            .iter()
            .any(|prefix| !prefix.is_empty() && identifier.starts_with(prefix.as_str()))
    }

    /// Whether tenant databases get a table for this content type
    pub fn is_provisioned(&self, identifier: &str) -> bool {
        !identifier.is_empty() && !self.is_tenant_family(identifier) && !self.is_internal(identifier)
    }
}

impl Default for TypeFamilies {
    fn default() -> Self {
        Self::from_config(&TenancyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_select_provisioned_types() {
        let families = TypeFamilies::default();
        assert!(families.is_provisioned("api::blog.blog"));
        assert!(families.is_provisioned("blog"));
        assert!(!families.is_provisioned("api::tenant.tenant"));
        assert!(!families.is_provisioned("admin::user"));
        assert!(!families.is_provisioned("plugin::upload.file"));
        assert!(!families.is_provisioned(""));
    }

    #[test]
    fn empty_prefixes_match_nothing() {
        let families = TypeFamilies::new("", vec![String::new()]);
        assert!(families.is_provisioned("api::tenant.tenant"));
        assert!(!families.is_tenant_family("anything"));
    }
}
