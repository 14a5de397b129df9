// Attribute type mapper: abstract attribute kind -> physical column

use serde::Serialize;
use std::fmt;

use super::declaration::{Attribute, AttributeKind, RelationCardinality};
use super::TypeFamilies;

/// Physical column kinds understood by the tenant databases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    LongText,
    Integer,
    Real,
    Boolean,
    Date,
    DateTime,
    Time,
    Json,
}

impl ColumnKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Text => "varchar(255)",
            ColumnKind::LongText => "text",
            ColumnKind::Integer => "integer",
            ColumnKind::Real => "real",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Date => "date",
            ColumnKind::DateTime => "datetime",
            ColumnKind::Time => "time",
            ColumnKind::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnDefault {
    CurrentTimestamp,
}

impl ColumnDefault {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnDefault::CurrentTimestamp => "CURRENT_TIMESTAMP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ColumnDefault>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKey>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            primary_key: false,
            default: None,
            foreign_key: None,
        }
    }

    /// Auto-incrementing integer primary key
    pub fn primary_key(name: impl Into<String>) -> Self {
        Self {
            nullable: false,
            primary_key: true,
            ..Self::new(name, ColumnKind::Integer)
        }
    }

    /// Audit timestamp defaulting to the time the row is written
    pub fn audit_timestamp(name: impl Into<String>) -> Self {
        Self {
            nullable: false,
            default: Some(ColumnDefault::CurrentTimestamp),
            ..Self::new(name, ColumnKind::DateTime)
        }
    }

    pub fn with_foreign_key(mut self, foreign_key: Option<ForeignKey>) -> Self {
        self.foreign_key = foreign_key;
        self
    }
}

/// A relation that produced no column because it needs a join table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeferredRelation {
    pub attribute: String,
    pub cardinality: RelationCardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Non-fatal diagnostics produced while mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum SchemaWarning {
    /// Stored as json; a join table has to be set up by hand
    RepeatableComponent { attribute: String },
    /// Degraded to a text column
    UnsupportedAttribute { attribute: String, type_name: String },
    /// Collides with a column every table already carries; skipped
    ReservedColumn { attribute: String },
}

impl fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaWarning::RepeatableComponent { attribute } => {
                write!(f, "repeatable component '{}' stored as json, manual join table setup needed", attribute)
            }
            SchemaWarning::UnsupportedAttribute { attribute, type_name } => {
                write!(f, "attribute '{}' has unsupported type '{}', stored as text", attribute, type_name)
            }
            SchemaWarning::ReservedColumn { attribute } => {
                write!(f, "attribute '{}' collides with a system column and was skipped", attribute)
            }
        }
    }
}

/// Outcome of mapping one attribute
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mapping {
    pub column: Option<ColumnSpec>,
    pub deferred: Option<DeferredRelation>,
    pub warning: Option<SchemaWarning>,
}

impl Mapping {
    fn column(column: ColumnSpec) -> Self {
        Self { column: Some(column), ..Self::default() }
    }

    fn with_warning(mut self, warning: SchemaWarning) -> Self {
        self.warning = Some(warning);
        self
    }
}

/// Lookups the mapper needs to decide on foreign keys
pub struct MappingContext<'a> {
    pub families: &'a TypeFamilies,
    pub resolve_target: &'a dyn Fn(&str) -> Option<String>,
}

impl MappingContext<'_> {
    /// FK target for a reference to `target`, if one should be emitted.
    /// Only provisioned types have a table in the tenant database; tenant
    /// records live in the registry and internal types nowhere.
    fn foreign_key(&self, target: Option<&str>) -> Option<ForeignKey> {
        let target = target?;
        if !self.families.is_provisioned(target) {
            return None;
        }
        (self.resolve_target)(target).map(|table| ForeignKey {
            table,
            column: "id".to_string(),
        })
    }
}

/// Map one attribute to its column. Pure: the same attribute and context
/// always produce the same mapping.
pub fn map_attribute(attribute: &Attribute, ctx: &MappingContext<'_>) -> Mapping {
    let name = attribute.name.as_str();

    match &attribute.kind {
        AttributeKind::ShortText => Mapping::column(ColumnSpec::new(name, ColumnKind::Text)),
        AttributeKind::LongText => Mapping::column(ColumnSpec::new(name, ColumnKind::LongText)),
        AttributeKind::Integer | AttributeKind::BigInteger => {
            Mapping::column(ColumnSpec::new(name, ColumnKind::Integer))
        }
        AttributeKind::Float => Mapping::column(ColumnSpec::new(name, ColumnKind::Real)),
        AttributeKind::Boolean => Mapping::column(ColumnSpec::new(name, ColumnKind::Boolean)),
        AttributeKind::Date => Mapping::column(ColumnSpec::new(name, ColumnKind::Date)),
        AttributeKind::DateTime => Mapping::column(ColumnSpec::new(name, ColumnKind::DateTime)),
        AttributeKind::Time => Mapping::column(ColumnSpec::new(name, ColumnKind::Time)),
        AttributeKind::Json
        | AttributeKind::DynamicZone
        | AttributeKind::Component { repeatable: false } => {
            Mapping::column(ColumnSpec::new(name, ColumnKind::Json))
        }
        AttributeKind::Component { repeatable: true } => {
            Mapping::column(ColumnSpec::new(name, ColumnKind::Json)).with_warning(
                SchemaWarning::RepeatableComponent { attribute: name.to_string() },
            )
        }
        AttributeKind::Media { target } => Mapping::column(
            ColumnSpec::new(format!("{}_id", name), ColumnKind::Integer)
                .with_foreign_key(ctx.foreign_key(target.as_deref())),
        ),
        AttributeKind::Relation { cardinality, target } if cardinality.owns_foreign_key() => {
            Mapping::column(
                ColumnSpec::new(format!("{}_id", name), ColumnKind::Integer)
                    .with_foreign_key(ctx.foreign_key(target.as_deref())),
            )
        }
        AttributeKind::Relation { cardinality, target } => Mapping {
            deferred: Some(DeferredRelation {
                attribute: name.to_string(),
                cardinality: *cardinality,
                target: target.clone(),
            }),
            ..Mapping::default()
        },
        AttributeKind::Unknown { type_name } => {
            Mapping::column(ColumnSpec::new(name, ColumnKind::Text)).with_warning(
                SchemaWarning::UnsupportedAttribute {
                    attribute: name.to_string(),
                    type_name: type_name.clone(),
                },
            )
        }
    }
}
