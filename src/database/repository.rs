use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::database::manager::DatabaseError;
use crate::database::record::{row_to_json, Record};
use crate::schema::synthesizer::ID_COLUMN;
use crate::schema::{quote_identifier, TableSpec};

/// Reads and writes rows of one synthesized content-type table
pub struct Repository<'a> {
    table: &'a TableSpec,
    pool: &'a SqlitePool,
}

impl<'a> Repository<'a> {
    pub fn new(table: &'a TableSpec, pool: &'a SqlitePool) -> Self {
        Self { table, pool }
    }

    /// Whether the table has been provisioned in this database
    pub async fn exists(&self) -> Result<bool, DatabaseError> {
        table_exists(self.pool, &self.table.name).await
    }

    pub async fn select_page(&self, limit: u32, offset: u32) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY {} LIMIT ? OFFSET ?",
            quote_identifier(&self.table.name),
            quote_identifier(ID_COLUMN)
        );

        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(self.pool)
            .await?;

        rows.iter()
            .map(|row| row_to_json(row, self.table).map_err(DatabaseError::from))
            .collect()
    }

    #[cfg(test)]
    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(&self.table.name));
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(self.pool).await?;
        Ok(count)
    }

    pub async fn select_id(&self, id: i64) -> Result<Option<Map<String, Value>>, DatabaseError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?",
            quote_identifier(&self.table.name),
            quote_identifier(ID_COLUMN)
        );

        let row = sqlx::query(&sql).bind(id).fetch_optional(self.pool).await?;
        row.map(|row| row_to_json(&row, self.table).map_err(DatabaseError::from))
            .transpose()
    }

    /// Insert `record` and return the stored row, system columns included
    pub async fn insert(&self, record: &Record) -> Result<Map<String, Value>, DatabaseError> {
        let table = quote_identifier(&self.table.name);
        let sql = if record.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            let columns: Vec<String> = record.column_names().map(quote_identifier).collect();
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!("INSERT INTO {} ({}) VALUES ({})", table, columns.join(", "), placeholders)
        };

        let result = record.bind_all(sqlx::query(&sql)).execute(self.pool).await?;
        let id = result.last_insert_rowid();

        self.select_id(id)
            .await?
            .ok_or(DatabaseError::Sqlx(sqlx::Error::RowNotFound))
    }
}

/// Table existence check against the SQLite catalog
pub async fn table_exists<'e, E>(executor: E, table: &str) -> Result<bool, DatabaseError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(executor)
            .await?;
    Ok(count > 0)
}
