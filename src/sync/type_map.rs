//! Logical field type to physical column type, per dialect.

use crate::models::connections::DbType;
use crate::models::rule::FieldType;

/// Physical type keyword, without length.
pub fn physical_type(dialect: DbType, field_type: FieldType) -> &'static str {
    match (dialect, field_type) {
        (_, FieldType::String | FieldType::ArrayString) => "VARCHAR",
        (_, FieldType::Text | FieldType::ArrayText) => "TEXT",
        (DbType::MySql | DbType::Postgres, FieldType::Number) => "BIGINT",
        (DbType::Sqlite, FieldType::Number) => "INTEGER",
    }
}

/// Physical type with its length, as used in column definitions.
pub fn column_type(dialect: DbType, field_type: FieldType, length: Option<u64>) -> String {
    let keyword = physical_type(dialect, field_type);
    match length {
        Some(length) if field_type.is_bounded() => format!("{}({})", keyword, length),
        _ => keyword.to_string(),
    }
}

pub fn max_varchar_length(dialect: DbType) -> u64 {
    match dialect {
        // 65535 bytes per row / 4 bytes per utf8mb4 char
        DbType::MySql => 16383,
        DbType::Postgres => 10_485_760,
        DbType::Sqlite => 1_000_000_000,
    }
}

/// Folds a raw type string to a canonical lowercase keyword:
/// `VARCHAR(255)` and `character varying` both become `varchar`.
pub fn normalize_type(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    let base = lower.split('(').next().unwrap_or_default().trim();
    let base = base
        .trim_end_matches(" unsigned")
        .trim_end_matches(" without time zone")
        .trim();

    match base {
        "character varying" | "varchar" | "nvarchar" => "varchar",
        "character" | "char" | "bpchar" | "nchar" => "char",
        "tinytext" | "mediumtext" | "longtext" | "text" => "text",
        "int8" | "bigint" => "bigint",
        "int" | "int4" | "integer" => "integer",
        "int2" | "smallint" => "smallint",
        other => other,
    }
    .to_string()
}

/// True when two raw type strings denote the same physical type.
pub fn same_type(a: &str, b: &str) -> bool {
    normalize_type(a) == normalize_type(b)
}

pub fn is_text_family(raw: &str) -> bool {
    normalize_type(raw) == "text"
}

pub fn is_string_family(raw: &str) -> bool {
    matches!(normalize_type(raw).as_str(), "varchar" | "char")
}

/// Reads the length out of `VARCHAR(100)`-style declarations.
pub fn declared_length(raw: &str) -> Option<u64> {
    let start = raw.find('(')?;
    let end = raw[start..].find(')')? + start;
    raw[start + 1..end]
        .split(',')
        .next()
        .and_then(|n| n.trim().parse().ok())
}
