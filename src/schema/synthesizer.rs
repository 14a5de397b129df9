// Schema synthesizer: content-type declaration -> table specification

use serde::Serialize;

use super::declaration::ContentTypeDeclaration;
use super::mapper::{map_attribute, ColumnSpec, DeferredRelation, MappingContext, SchemaWarning};
use super::TypeFamilies;

pub const ID_COLUMN: &str = "id";
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const UPDATED_AT_COLUMN: &str = "updated_at";
pub const PUBLISHED_AT_COLUMN: &str = "published_at";

/// Columns every synthesized table carries; attributes may not reuse them
pub const SYSTEM_COLUMNS: &[&str] = &[ID_COLUMN, CREATED_AT_COLUMN, UPDATED_AT_COLUMN, PUBLISHED_AT_COLUMN];

/// Physical definition of one content type's table. Recomputed on every
/// synthesis, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub name: String,
    pub content_type: String,
    pub columns: Vec<ColumnSpec>,
    pub deferred_relations: Vec<DeferredRelation>,
    pub warnings: Vec<SchemaWarning>,
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns a client may write; the system columns are managed here
    pub fn writable_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns
            .iter()
            .filter(|c| !SYSTEM_COLUMNS.contains(&c.name.as_str()))
    }

    /// SQLite DDL for this table. Deterministic for a given spec.
    pub fn create_table_sql(&self) -> String {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut line = format!("    {} {}", quote_identifier(&column.name), column.kind.sql_type());
                if !column.nullable {
                    line += " NOT NULL";
                }
                if column.primary_key {
                    line += " PRIMARY KEY AUTOINCREMENT";
                }
                if let Some(default) = column.default {
                    line += &format!(" DEFAULT {}", default.sql());
                }
                line
            })
            .collect();

        for column in &self.columns {
            if let Some(fk) = &column.foreign_key {
                lines.push(format!(
                    "    FOREIGN KEY ({}) REFERENCES {} ({})",
                    quote_identifier(&column.name),
                    quote_identifier(&fk.table),
                    quote_identifier(&fk.column)
                ));
            }
        }

        format!("CREATE TABLE {} (\n{}\n)", quote_identifier(&self.name), lines.join(",\n"))
    }
}

/// Quote SQL identifier to prevent injection
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Derives table specifications from declarations. Never touches a database.
#[derive(Debug, Clone, Default)]
pub struct SchemaSynthesizer {
    families: TypeFamilies,
}

impl SchemaSynthesizer {
    pub fn new(families: TypeFamilies) -> Self {
        Self { families }
    }

    pub fn families(&self) -> &TypeFamilies {
        &self.families
    }

    /// Build the table for `declaration`. `resolve_target` maps a content-type
    /// identifier to its physical table name; unresolved targets get no FK.
    pub fn synthesize(
        &self,
        declaration: &ContentTypeDeclaration,
        resolve_target: &dyn Fn(&str) -> Option<String>,
    ) -> TableSpec {
        let ctx = MappingContext {
            families: &self.families,
            resolve_target,
        };

        let mut table = TableSpec {
            name: declaration.physical_table_name(),
            content_type: declaration.identifier.clone(),
            columns: vec![ColumnSpec::primary_key(ID_COLUMN)],
            deferred_relations: Vec::new(),
            warnings: Vec::new(),
        };

        for attribute in declaration.attributes.iter() {
            if SYSTEM_COLUMNS.contains(&attribute.name.as_str()) {
                table.warnings.push(SchemaWarning::ReservedColumn {
                    attribute: attribute.name.clone(),
                });
                continue;
            }

            let mapping = map_attribute(attribute, &ctx);
            table.columns.extend(mapping.column);
            table.deferred_relations.extend(mapping.deferred);
            table.warnings.extend(mapping.warning);
        }

        table.columns.push(ColumnSpec::audit_timestamp(CREATED_AT_COLUMN));
        table.columns.push(ColumnSpec::audit_timestamp(UPDATED_AT_COLUMN));
        if declaration.draft_and_publish {
            table.columns.push(ColumnSpec::new(PUBLISHED_AT_COLUMN, super::ColumnKind::DateTime));
        }

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeKind, ColumnDefault, ColumnKind, RelationCardinality};

    fn no_targets(_: &str) -> Option<String> {
        None
    }

    fn blog() -> ContentTypeDeclaration {
        ContentTypeDeclaration::new("blog")
            .with_attribute("title", AttributeKind::ShortText)
            .with_attribute("views", AttributeKind::Integer)
    }

    #[test]
    fn blog_scenario_columns() {
        let table = SchemaSynthesizer::default().synthesize(&blog(), &no_targets);

        assert_eq!(table.name, "blog");
        let columns: Vec<(&str, ColumnKind)> =
            table.columns.iter().map(|c| (c.name.as_str(), c.kind)).collect();
        assert_eq!(
            columns,
            vec![
                ("id", ColumnKind::Integer),
                ("title", ColumnKind::Text),
                ("views", ColumnKind::Integer),
                ("created_at", ColumnKind::DateTime),
                ("updated_at", ColumnKind::DateTime),
            ]
        );
        assert!(table.columns[0].primary_key);
        assert_eq!(table.columns[3].default, Some(ColumnDefault::CurrentTimestamp));
        assert_eq!(table.columns[4].default, Some(ColumnDefault::CurrentTimestamp));
        assert!(table.warnings.is_empty());
    }

    #[test]
    fn synthesis_is_byte_identical() {
        let decl = blog()
            .with_draft_and_publish(true)
            .with_attribute(
                "author",
                AttributeKind::Relation {
                    cardinality: RelationCardinality::ManyToOne,
                    target: Some("api::author.author".to_string()),
                },
            );
        let resolve = |id: &str| (id == "api::author.author").then(|| "authors".to_string());
        let synthesizer = SchemaSynthesizer::default();

        let first = synthesizer.synthesize(&decl, &resolve);
        let second = synthesizer.synthesize(&decl, &resolve);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(first.create_table_sql(), second.create_table_sql());
    }

    #[test]
    fn draft_publish_adds_nullable_published_at() {
        let table = SchemaSynthesizer::default().synthesize(&blog().with_draft_and_publish(true), &no_targets);
        let published = table.columns.last().unwrap();
        assert_eq!(published.name, "published_at");
        assert!(published.nullable);
        assert!(published.default.is_none());
    }

    #[test]
    fn many_to_many_is_recorded_as_deferred() {
        let decl = blog().with_attribute(
            "tags",
            AttributeKind::Relation {
                cardinality: RelationCardinality::ManyToMany,
                target: Some("api::tag.tag".to_string()),
            },
        );
        let table = SchemaSynthesizer::default().synthesize(&decl, &no_targets);

        assert!(table.column("tags").is_none());
        assert!(table.column("tags_id").is_none());
        assert_eq!(table.deferred_relations.len(), 1);
        assert_eq!(table.deferred_relations[0].attribute, "tags");
        assert_eq!(table.columns.len(), 5);
    }

    #[test]
    fn system_column_collisions_are_skipped_with_warning() {
        let decl = blog().with_attribute("created_at", AttributeKind::ShortText);
        let table = SchemaSynthesizer::default().synthesize(&decl, &no_targets);

        assert_eq!(table.columns.iter().filter(|c| c.name == "created_at").count(), 1);
        assert_eq!(
            table.warnings,
            vec![SchemaWarning::ReservedColumn { attribute: "created_at".to_string() }]
        );
    }

    #[test]
    fn renders_create_table_ddl() {
        let decl = blog().with_attribute(
            "author",
            AttributeKind::Relation {
                cardinality: RelationCardinality::OneToOne,
                target: Some("api::author.author".to_string()),
            },
        );
        let resolve = |_: &str| Some("authors".to_string());
        let sql = SchemaSynthesizer::default().synthesize(&decl, &resolve).create_table_sql();

        assert_eq!(
            sql,
            "CREATE TABLE \"blog\" (\n\
             \x20   \"id\" integer NOT NULL PRIMARY KEY AUTOINCREMENT,\n\
             \x20   \"title\" varchar(255),\n\
             \x20   \"views\" integer,\n\
             \x20   \"author_id\" integer,\n\
             \x20   \"created_at\" datetime NOT NULL DEFAULT CURRENT_TIMESTAMP,\n\
             \x20   \"updated_at\" datetime NOT NULL DEFAULT CURRENT_TIMESTAMP,\n\
             \x20   FOREIGN KEY (\"author_id\") REFERENCES \"authors\" (\"id\")\n\
             )"
        );
    }

    #[test]
    fn writable_columns_exclude_system_columns() {
        let table = SchemaSynthesizer::default().synthesize(&blog().with_draft_and_publish(true), &no_targets);
        let names: Vec<_> = table.writable_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["title", "views"]);
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("blog"), "\"blog\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
