use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool, Row};

use crate::{
    errors::DbError,
    models::{
        connections::DbType,
        schema::{ColumnInfo, IndexInfo},
    },
};

use super::{group_indexes, normalize_default, DbClient};

// Casts keep the decoded types stable across MySQL 5.7/8.x and MariaDB.
const COLUMNS_QUERY: &str = r#"
    SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
           CAST(DATA_TYPE AS CHAR) AS data_type,
           CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS max_length,
           CAST(IS_NULLABLE AS CHAR) AS is_nullable,
           CAST(COLUMN_DEFAULT AS CHAR) AS column_default
    FROM information_schema.COLUMNS
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

const INDEXES_QUERY: &str = r#"
    SELECT CAST(INDEX_NAME AS CHAR) AS index_name,
           CAST(COLUMN_NAME AS CHAR) AS column_name
    FROM information_schema.STATISTICS
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND NON_UNIQUE = 1
    ORDER BY INDEX_NAME, SEQ_IN_INDEX
"#;

const EXISTS_QUERY: &str = r#"
    SELECT COUNT(*) AS present
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
"#;

pub struct MySqlClient {
    pub pool: MySqlPool,
}

impl MySqlClient {
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DbClient for MySqlClient {
    fn dialect(&self) -> DbType {
        DbType::MySql
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
            let name: String = row.try_get("column_name")?;
            let length: Option<i64> = row.try_get("max_length")?;
            let column = ColumnInfo {
                data_type: row.try_get("data_type")?,
                length: length.and_then(|l| u64::try_from(l).ok()),
                is_nullable: row.try_get::<String, _>("is_nullable")? == "YES",
                default: normalize_default(row.try_get("column_default")?),
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

        let pairs = rows
            .iter()
            .map(|row| Ok((row.try_get("index_name")?, row.try_get("column_name")?)))
            .collect::<Result<Vec<(String, String)>, DbError>>()?;

        Ok(group_indexes(pairs))
    }
}
