use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

use crate::{
    errors::DbError,
    models::{
        connections::DbType,
        schema::{ColumnInfo, IndexInfo},
    },
    sync::type_map::declared_length,
};

use super::{group_indexes, normalize_default, DbClient};

const COLUMNS_QUERY: &str = r#"
    SELECT name, type, "notnull" AS not_null, dflt_value
    FROM pragma_table_info(?1)
    ORDER BY cid
"#;

// origin 'c' keeps CREATE INDEX indexes and skips primary key / unique autoindexes;
// explicit CREATE UNIQUE INDEX is left out as well.
const INDEXES_QUERY: &str = r#"
    SELECT il.name AS index_name, ii.name AS column_name
    FROM pragma_index_list(?1) AS il, pragma_index_info(il.name) AS ii
    WHERE il.origin = 'c' AND il."unique" = 0
    ORDER BY il.name, ii.seqno
"#;

const EXISTS_QUERY: &str = r#"
    SELECT COUNT(*) AS present
    FROM sqlite_master
    WHERE type = 'table' AND name = ?1
"#;

pub struct SqliteClient {
    pub pool: SqlitePool,
}

impl SqliteClient {
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DbClient for SqliteClient {
    fn dialect(&self) -> DbType {
        DbType::Sqlite
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

        let count: i64 = row.try_get("present")?;
        Ok(count > 0)
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
            let name: String = row.try_get("name")?;
            let declared: String = row.try_get("type")?;
            let not_null: i64 = row.try_get("not_null")?;
            let column = ColumnInfo {
                length: declared_length(&declared),
                data_type: declared,
                is_nullable: not_null == 0,
                default: normalize_default(row.try_get("dflt_value")?),
                comment: None,
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

        let mut pairs = Vec::new();
        for row in rows.iter() {
            // Expression indexes have no column name.
            let column: Option<String> = row.try_get("column_name")?;
            if let Some(column) = column {
                pairs.push((row.try_get("index_name")?, column));
            }
        }

        Ok(group_indexes(pairs))
    }
}
