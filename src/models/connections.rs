use std::env;

use serde::{Deserialize, Serialize};

use crate::errors::DbError;

/// The supported SQL dialects. Selected once at startup.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    MySql,
    Sqlite,
}

impl DbType {
    pub fn parse(name: &str) -> Result<Self, DbError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DbType::Postgres),
            "mysql" | "mariadb" => Ok(DbType::MySql),
            "sqlite" | "sqlite3" => Ok(DbType::Sqlite),
            other => Err(DbError::Config(format!("unknown database type `{}`", other))),
        }
    }

    /// Infers the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| DbError::Config(format!("cannot infer database type from `{}`", url)))?;
        Self::parse(scheme)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DbType::Postgres => "postgres",
            DbType::MySql => "mysql",
            DbType::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionConfig {
    pub db_type: DbType,
    pub database_url: String,
}

impl ConnectionConfig {
    /// Reads `DATABASE_URL` and the optional `DB_TYPE` override.
    pub fn from_env() -> Result<Self, DbError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| DbError::Config("DATABASE_URL must be set".to_string()))?;
        let db_type = match env::var("DB_TYPE") {
            Ok(name) => DbType::parse(&name)?,
            Err(_) => DbType::from_url(&database_url)?,
        };

        Ok(Self {
            db_type,
            database_url,
        })
    }
}

/// Run-wide switches threaded into the orchestrator and the applier.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncOptions {
    /// Dry-run: log every statement instead of executing it.
    pub plan: bool,
    /// Let a bounded column shrink below its current length.
    pub allow_shrink: bool,
    /// Reconcile PostgreSQL column comments.
    pub pg_comments: bool,
    pub mysql_engine: String,
    pub mysql_charset: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            plan: false,
            allow_shrink: false,
            pg_comments: true,
            mysql_engine: "InnoDB".to_string(),
            mysql_charset: "utf8mb4".to_string(),
        }
    }
}

impl SyncOptions {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            plan: env_flag("SYNC_PLAN").unwrap_or(defaults.plan),
            allow_shrink: env_flag("SYNC_ALLOW_SHRINK").unwrap_or(defaults.allow_shrink),
            pg_comments: env_flag("SYNC_PG_COMMENTS").unwrap_or(defaults.pg_comments),
            mysql_engine: env::var("MYSQL_ENGINE").unwrap_or(defaults.mysql_engine),
            mysql_charset: env::var("MYSQL_CHARSET").unwrap_or(defaults.mysql_charset),
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
