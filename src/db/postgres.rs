use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::{
    errors::DbError,
    models::{
        connections::DbType,
        schema::{ColumnInfo, IndexInfo},
    },
};

use super::{group_indexes, normalize_pg_default, DbClient};

// information_schema exposes domain types (sql_identifier, cardinal_number); cast them.
const COLUMNS_QUERY: &str = r#"
    SELECT c.column_name::text AS column_name,
           c.data_type::text AS data_type,
           c.character_maximum_length::int8 AS max_length,
           c.is_nullable::text AS is_nullable,
           c.column_default::text AS column_default,
           col_description(
               format('%I.%I', c.table_schema, c.table_name)::regclass,
               c.ordinal_position::int
           ) AS column_comment
    FROM information_schema.columns c
    WHERE c.table_schema = current_schema() AND c.table_name = $1
    ORDER BY c.ordinal_position
"#;

const INDEXES_QUERY: &str = r#"
    SELECT i.relname::text AS index_name, a.attname::text AS column_name
    FROM pg_index ix
    JOIN pg_class t ON t.oid = ix.indrelid
    JOIN pg_class i ON i.oid = ix.indexrelid
    JOIN pg_namespace n ON n.oid = t.relnamespace
    JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) ON true
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    WHERE n.nspname = current_schema() AND t.relname = $1
      AND NOT ix.indisprimary AND NOT ix.indisunique
    ORDER BY i.relname, k.ord
"#;

const EXISTS_QUERY: &str = r#"
    SELECT EXISTS (
        SELECT 1 FROM information_schema.tables
        WHERE table_schema = current_schema() AND table_name = $1
    ) AS present
"#;

pub struct PostgresClient {
    pub pool: PgPool,
}

impl PostgresClient {
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DbClient for PostgresClient {
    fn dialect(&self) -> DbType {
        DbType::Postgres
    }

    async fn execute(&self, query: &str) -> Result<(), DbError> {
        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;
        Ok(())
    }

    async fn table_exists(&self, table_name: &str) -> Result<bool, DbError> {
        let row = sqlx::query(EXISTS_QUERY)
            .bind(table_name)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        Ok(row.try_get("present")?)
    }

    async fn get_columns(
        &self,
        table_name: &str,
    ) -> Result<BTreeMap<String, ColumnInfo>, DbError> {
        let rows = sqlx::query(COLUMNS_QUERY)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        let mut columns = BTreeMap::new();
        for row in rows.iter() {
            let name: String = row.try_get("column_name")?;
            let length: Option<i64> = row.try_get("max_length")?;
            let column = ColumnInfo {
                data_type: row.try_get("data_type")?,
                length: length.and_then(|l| u64::try_from(l).ok()),
                is_nullable: row.try_get::<String, _>("is_nullable")? == "YES",
                default: normalize_pg_default(row.try_get("column_default")?),
                comment: row.try_get("column_comment")?,
            };
            columns.insert(name, column);
        }

        Ok(columns)
    }

    async fn get_indexes(&self, table_name: &str) -> Result<IndexInfo, DbError> {
        let rows = sqlx::query(INDEXES_QUERY)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;

        let pairs = rows
            .iter()
            .map(|row| Ok((row.try_get("index_name")?, row.try_get("column_name")?)))
            .collect::<Result<Vec<(String, String)>, DbError>>()?;

        Ok(group_indexes(pairs))
    }
}
