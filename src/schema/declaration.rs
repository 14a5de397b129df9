use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Cardinality of a `relation` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationCardinality {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl RelationCardinality {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "oneToOne" | "one-to-one" => Some(Self::OneToOne),
            "manyToOne" | "many-to-one" => Some(Self::ManyToOne),
            "oneToMany" | "one-to-many" => Some(Self::OneToMany),
            "manyToMany" | "many-to-many" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "oneToOne",
            Self::ManyToOne => "manyToOne",
            Self::OneToMany => "oneToMany",
            Self::ManyToMany => "manyToMany",
        }
    }

    /// Whether the owning table carries the `<attr>_id` column. The other
    /// cardinalities need a join table.
    pub fn owns_foreign_key(&self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }
}

impl fmt::Display for RelationCardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of abstract attribute kinds. Anything the declaration source
/// sends that is not recognised lands in `Unknown` and is handled by the
/// mapper's explicit fallback branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    ShortText,
    LongText,
    Integer,
    BigInteger,
    Float,
    Boolean,
    Date,
    DateTime,
    Time,
    Json,
    DynamicZone,
    Component { repeatable: bool },
    Media { target: Option<String> },
    Relation { cardinality: RelationCardinality, target: Option<String> },
    Unknown { type_name: String },
}

/// Wire shape of an attribute as content-type documents write it
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAttribute {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    repeatable: bool,
}

impl From<RawAttribute> for AttributeKind {
    fn from(raw: RawAttribute) -> Self {
        match raw.type_name.as_str() {
            "string" | "uid" | "email" | "password" | "enumeration" => Self::ShortText,
            "text" | "richtext" => Self::LongText,
            "integer" => Self::Integer,
            "biginteger" => Self::BigInteger,
            "float" | "decimal" => Self::Float,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "datetime" | "timestamp" => Self::DateTime,
            "time" => Self::Time,
            "json" | "blocks" => Self::Json,
            "dynamiczone" => Self::DynamicZone,
            "component" => Self::Component { repeatable: raw.repeatable },
            "media" => Self::Media { target: raw.target },
            "relation" => match raw.relation.as_deref().and_then(RelationCardinality::parse) {
                Some(cardinality) => Self::Relation { cardinality, target: raw.target },
                None => Self::Unknown {
                    type_name: format!("relation:{}", raw.relation.unwrap_or_default()),
                },
            },
            _ => Self::Unknown { type_name: raw.type_name },
        }
    }
}

impl From<AttributeKind> for RawAttribute {
    fn from(kind: AttributeKind) -> Self {
        let plain = |type_name: &str| RawAttribute {
            type_name: type_name.to_string(),
            relation: None,
            target: None,
            repeatable: false,
        };

        match kind {
            AttributeKind::ShortText => plain("string"),
            AttributeKind::LongText => plain("text"),
            AttributeKind::Integer => plain("integer"),
            AttributeKind::BigInteger => plain("biginteger"),
            AttributeKind::Float => plain("float"),
            AttributeKind::Boolean => plain("boolean"),
            AttributeKind::Date => plain("date"),
            AttributeKind::DateTime => plain("datetime"),
            AttributeKind::Time => plain("time"),
            AttributeKind::Json => plain("json"),
            AttributeKind::DynamicZone => plain("dynamiczone"),
            AttributeKind::Component { repeatable } => RawAttribute {
                repeatable,
                ..plain("component")
            },
            AttributeKind::Media { target } => RawAttribute { target, ..plain("media") },
            AttributeKind::Relation { cardinality, target } => RawAttribute {
                relation: Some(cardinality.as_str().to_string()),
                target,
                ..plain("relation")
            },
            AttributeKind::Unknown { type_name } => plain(&type_name),
        }
    }
}

impl Serialize for AttributeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawAttribute::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttributeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawAttribute::deserialize(deserializer).map(AttributeKind::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self { name: name.into(), kind }
    }
}

/// Attributes in declaration order. Serialized as a map, but unlike a
/// `HashMap` the order of the source document is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.0.iter().find(|a| a.name == name)
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        // Later duplicates replace earlier ones so names stay unique
        let mut attributes: Vec<Attribute> = Vec::new();
        for attribute in iter {
            match attributes.iter_mut().find(|a| a.name == attribute.name) {
                Some(existing) => *existing = attribute,
                None => attributes.push(attribute),
            }
        }
        Self(attributes)
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for attribute in &self.0 {
            map.serialize_entry(&attribute.name, &attribute.kind)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedAttributes;

        impl<'de> Visitor<'de> for OrderedAttributes {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of attribute name to attribute definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut attributes = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, kind)) = access.next_entry::<String, AttributeKind>()? {
                    attributes.push(Attribute { name, kind });
                }
                Ok(attributes.into_iter().collect())
            }
        }

        deserializer.deserialize_map(OrderedAttributes)
    }
}

/// Externally declared content type. Identifiers never change once tables exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeDeclaration {
    pub identifier: String,
    #[serde(default, alias = "collectionName", skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, alias = "draftAndPublish")]
    pub draft_and_publish: bool,
    #[serde(default)]
    pub attributes: Attributes,
}

impl ContentTypeDeclaration {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            table_name: None,
            draft_and_publish: false,
            attributes: Attributes::default(),
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn with_draft_and_publish(mut self, enabled: bool) -> Self {
        self.draft_and_publish = enabled;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, kind: AttributeKind) -> Self {
        self.attributes = self
            .attributes
            .0
            .into_iter()
            .chain(std::iter::once(Attribute::new(name, kind)))
            .collect();
        self
    }

    /// Physical table name: the explicit one, else the identifier with
    /// `:` and `.` folded to `_` (`api::blog.blog` -> `api__blog_blog`).
    pub fn physical_table_name(&self) -> String {
        match &self.table_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.identifier.replace([':', '.'], "_"),
        }
    }
}
