use thiserror::Error;

/// Custom error type for database and schema sync operations.
#[derive(Error, Debug)]
pub enum DbError {
    /// Error that occurs during database interactions (e.g., SQL query failure).
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    /// Configuration error (e.g., invalid database URL or missing parameters).
    #[error("Configuration error: {0}")]
    Config(String),
    /// Connection error (e.g., issues with network or database connection).
    #[error("Connection error: {0}")]
    Connection(String),
    /// Table definition file could not be read or decoded.
    #[error("Definition error: {0}")]
    Definition(String),
    #[error(transparent)]
    Rule(#[from] RuleError),
    /// A column type change that cannot be applied without data loss.
    #[error(
        "Refusing to change type of column `{column}` in table `{table}` from {current} to {target}"
    )]
    TypeChange {
        table: String,
        column: String,
        current: String,
        target: String,
    },
}

/// A rule string that failed to parse or validate. Scoped to one field.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid rule for field `{field}` in table `{table}`: {reason}")]
pub struct RuleError {
    pub table: String,
    pub field: String,
    pub reason: String,
}

impl RuleError {
    pub fn new(table: &str, field: &str, reason: impl Into<String>) -> Self {
        Self {
            table: table.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
