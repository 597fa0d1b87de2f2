use std::collections::BTreeMap;

use crate::{
    errors::DbError,
    models::{
        connections::{ConnectionConfig, DbType},
        schema::{ColumnInfo, IndexInfo},
    },
};
use async_trait::async_trait;

pub mod mysql;
pub mod postgres;
pub mod sqlite;

use mysql::MySqlClient;
use postgres::PostgresClient;
use sqlite::SqliteClient;

/// SQL execution handle plus read-only schema introspection for one dialect.
#[async_trait]
pub trait DbClient: Send + Sync {
    fn dialect(&self) -> DbType;
    /// Runs arbitrary DDL/DML text.
    async fn execute(&self, query: &str) -> Result<(), DbError>;
    async fn table_exists(&self, table_name: &str) -> Result<bool, DbError>;
    /// Empty when the table does not exist.
    async fn get_columns(&self, table_name: &str)
        -> Result<BTreeMap<String, ColumnInfo>, DbError>;
    /// Secondary indexes only; the primary key is left out. Empty when the table does not exist.
    async fn get_indexes(&self, table_name: &str) -> Result<IndexInfo, DbError>;
}

pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DbClient>, DbError> {
    let client: Box<dyn DbClient> = match config.db_type {
        DbType::Postgres => Box::new(PostgresClient::connect(&config.database_url).await?),
        DbType::MySql => Box::new(MySqlClient::connect(&config.database_url).await?),
        DbType::Sqlite => Box::new(SqliteClient::connect(&config.database_url).await?),
    };
    Ok(client)
}

/// Normalizes an introspected column default: unquotes a single-quoted literal
/// and maps a textual `NULL` to no default. Anything else is kept verbatim,
/// since MySQL 8 reports string defaults unquoted.
pub(crate) fn normalize_default(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let value = raw.trim();

    if value.eq_ignore_ascii_case("null") {
        return None;
    }

    match value.strip_prefix('\'') {
        Some(rest) => Some(unquote(rest)),
        None => Some(value.to_string()),
    }
}

/// PostgreSQL flavour of `normalize_default`: also drops the `::type` cast and
/// wrapping parens it puts around non-literal defaults.
pub(crate) fn normalize_pg_default(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let value = raw.trim();
    if value.starts_with('\'') {
        return normalize_default(Some(value.to_string()));
    }

    // e.g. `(0)::bigint`, `18::integer` or `NULL::character varying`
    let value = value.split("::").next().unwrap_or(value);
    let value = value.trim_start_matches('(').trim_end_matches(')');
    normalize_default(Some(value.to_string()))
}

/// Reads a literal body up to its closing quote, folding `''` into `'`.
fn unquote(body: &str) -> String {
    let mut out = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
            } else {
                break;
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Groups `(index_name, column_name)` rows, already ordered by position, into `IndexInfo`.
pub(crate) fn group_indexes(rows: impl IntoIterator<Item = (String, String)>) -> IndexInfo {
    let mut indexes = IndexInfo::new();
    for (index, column) in rows {
        indexes.entry(index).or_default().push(column);
    }
    indexes
}

#[cfg(test)]
mockall::mock! {
    pub DbClient {}

    #[async_trait]
    impl DbClient for DbClient {
        fn dialect(&self) -> DbType;
        async fn execute(&self, query: &str) -> Result<(), DbError>;
        async fn table_exists(&self, table_name: &str) -> Result<bool, DbError>;
        async fn get_columns(&self, table_name: &str)
            -> Result<BTreeMap<String, ColumnInfo>, DbError>;
        async fn get_indexes(&self, table_name: &str) -> Result<IndexInfo, DbError>;
    }
}
