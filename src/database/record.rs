use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{query::Query, Row, Sqlite, ValueRef};

use crate::schema::synthesizer::SYSTEM_COLUMNS;
use crate::schema::{ColumnKind, ColumnSpec, TableSpec};

/// Errors that can occur while converting API input into a row
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("System field '{0}' cannot be set via API input")]
    SystemFieldNotAllowed(String),
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Unknown field '{field}' for table '{table}'")]
    UnknownField { field: String, table: String },
    #[error("Invalid value for field '{field}': expected {expected}")]
    InvalidValue { field: String, expected: &'static str },
}

/// Validated field values for one content-type row, in table column order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(ColumnSpec, Value)>,
}

impl Record {
    /// Create record from API input JSON against the table it will be
    /// written to. System columns and unknown fields are rejected.
    pub fn from_api_input(json: Value, table: &TableSpec) -> Result<Self, RecordError> {
        let mut map = match json {
            Value::Object(map) => map,
            _ => return Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        };

        if let Some(key) = map.keys().find(|k| SYSTEM_COLUMNS.contains(&k.as_str())) {
            return Err(RecordError::SystemFieldNotAllowed(key.clone()));
        }

        let mut fields = Vec::new();
        for column in table.writable_columns() {
            if let Some(value) = map.remove(&column.name) {
                check_value(column, &value)?;
                fields.push((column.clone(), value));
            }
        }

        if let Some(field) = map.keys().next() {
            return Err(RecordError::UnknownField {
                field: field.clone(),
                table: table.name.clone(),
            });
        }

        Ok(Self { fields })
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(c, _)| c.name == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.name.as_str())
    }

    /// Bind every field value, in column order, onto `query`
    pub(crate) fn bind_all<'q>(
        &'q self,
        mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        for (column, value) in &self.fields {
            query = bind_value(query, column.kind, value);
        }
        query
    }

    #[cfg(test)]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(c, v)| (c.name.clone(), v.clone()))
                .collect(),
        )
    }
}

fn check_value(column: &ColumnSpec, value: &Value) -> Result<(), RecordError> {
    let invalid = |expected| RecordError::InvalidValue {
        field: column.name.clone(),
        expected,
    };

    match (column.kind, value) {
        (_, Value::Null) if column.nullable => Ok(()),
        (_, Value::Null) => Err(invalid("a value")),
        (ColumnKind::Integer, Value::Number(n)) if n.is_i64() => Ok(()),
        (ColumnKind::Integer, _) => Err(invalid("an integer")),
        (ColumnKind::Real, Value::Number(_)) => Ok(()),
        (ColumnKind::Real, _) => Err(invalid("a number")),
        (ColumnKind::Boolean, Value::Bool(_)) => Ok(()),
        (ColumnKind::Boolean, _) => Err(invalid("a boolean")),
        (ColumnKind::Json, _) => Ok(()),
        (
            ColumnKind::Text | ColumnKind::LongText | ColumnKind::Date | ColumnKind::DateTime | ColumnKind::Time,
            Value::String(_),
        ) => Ok(()),
        _ => Err(invalid("a string")),
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    kind: ColumnKind,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match (kind, value) {
        (_, Value::Null) => query.bind(None::<String>),
        (ColumnKind::Integer, v) => query.bind(v.as_i64()),
        (ColumnKind::Real, v) => query.bind(v.as_f64()),
        (ColumnKind::Boolean, v) => query.bind(v.as_bool()),
        (ColumnKind::Json, v) => query.bind(v.to_string()),
        (_, Value::String(s)) => query.bind(s.as_str()),
        (_, v) => query.bind(v.to_string()),
    }
}

/// Convert a row of `table` into a JSON object keyed by column name
pub fn row_to_json(row: &SqliteRow, table: &TableSpec) -> Result<Map<String, Value>, sqlx::Error> {
    let mut object = Map::new();
    for column in &table.columns {
        let name = column.name.as_str();
        if row.try_get_raw(name)?.is_null() {
            object.insert(column.name.clone(), Value::Null);
            continue;
        }

        let value = match column.kind {
            ColumnKind::Integer => Value::from(row.try_get_unchecked::<i64, _>(name)?),
            ColumnKind::Real => Value::from(row.try_get_unchecked::<f64, _>(name)?),
            ColumnKind::Boolean => Value::Bool(row.try_get_unchecked::<i64, _>(name)? != 0),
            ColumnKind::Json => {
                let text: String = row.try_get_unchecked(name)?;
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            _ => Value::String(row.try_get_unchecked::<String, _>(name)?),
        };
        object.insert(column.name.clone(), value);
    }
    Ok(object)
}
