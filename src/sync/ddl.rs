//! Dialect-specific DDL text. Pure string builders, no I/O.

use crate::models::connections::{DbType, SyncOptions};
use crate::models::plan::IndexOp;
use crate::models::rule::{DefaultValue, FieldRule};

use super::type_map::{column_type, is_text_family, normalize_type};

/// Fixed comments for system columns (PostgreSQL `COMMENT ON COLUMN`).
pub const SYSTEM_COMMENTS: [(&str, &str); 5] = [
    ("id", "主键ID"),
    ("created_at", "创建时间"),
    ("updated_at", "更新时间"),
    ("deleted_at", "删除时间"),
    ("state", "状态"),
];

/// System columns that always carry an index.
pub const SYSTEM_INDEX_FIELDS: [&str; 3] = ["created_at", "updated_at", "state"];

/// In-place PostgreSQL type changes that keep every existing value.
const PG_COMPATIBLE_CHANGES: [(&str, &str); 6] = [
    ("varchar", "text"),
    ("char", "varchar"),
    ("char", "text"),
    ("smallint", "integer"),
    ("smallint", "bigint"),
    ("integer", "bigint"),
];

pub fn is_pg_compatible_type_change(from: &str, to: &str) -> bool {
    let pair = (normalize_type(from), normalize_type(to));
    PG_COMPATIBLE_CHANGES
        .iter()
        .any(|(f, t)| pair.0 == *f && pair.1 == *t)
}

pub fn index_name(table: &str, field: &str) -> String {
    format!("idx_{}_{}", table, field)
}

/// Collapses runs of whitespace (including newlines) to single spaces.
pub fn collapse_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Renders DDL for one table under one dialect.
pub struct DdlBuilder<'a> {
    dialect: DbType,
    table: &'a str,
    options: &'a SyncOptions,
}

impl<'a> DdlBuilder<'a> {
    pub fn new(dialect: DbType, table: &'a str, options: &'a SyncOptions) -> Self {
        Self {
            dialect,
            table,
            options,
        }
    }

    pub fn dialect(&self) -> DbType {
        self.dialect
    }

    pub fn table(&self) -> &'a str {
        self.table
    }

    pub fn quote(&self, ident: &str) -> String {
        match self.dialect {
            DbType::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
            DbType::MySql | DbType::Sqlite => format!("`{}`", ident.replace('`', "``")),
        }
    }

    pub fn alter_table(&self, clause: &str) -> String {
        format!("ALTER TABLE {} {}", self.quote(self.table), clause)
    }

    pub fn system_column_defs(&self) -> Vec<String> {
        let defs: [(&str, &str); 5] = match self.dialect {
            DbType::MySql => [
                ("id", "BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY COMMENT '主键ID'"),
                ("created_at", "DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP COMMENT '创建时间'"),
                (
                    "updated_at",
                    "DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP COMMENT '更新时间'",
                ),
                ("deleted_at", "DATETIME NULL DEFAULT NULL COMMENT '删除时间'"),
                ("state", "TINYINT NOT NULL DEFAULT 1 COMMENT '状态'"),
            ],
            DbType::Postgres => [
                ("id", "BIGSERIAL PRIMARY KEY"),
                ("created_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"),
                ("updated_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"),
                ("deleted_at", "TIMESTAMP NULL DEFAULT NULL"),
                ("state", "SMALLINT NOT NULL DEFAULT 1"),
            ],
            DbType::Sqlite => [
                ("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
                ("created_at", "DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"),
                ("updated_at", "DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"),
                ("deleted_at", "DATETIME NULL DEFAULT NULL"),
                ("state", "INTEGER NOT NULL DEFAULT 1"),
            ],
        };
        defs.iter()
            .map(|(name, def)| format!("{} {}", self.quote(name), def))
            .collect()
    }

    /// Single-quoted string literal. MySQL treats `\` as an escape inside
    /// literals, so it is doubled there along with `'`.
    pub fn literal(&self, value: &str) -> String {
        let escaped = match self.dialect {
            DbType::MySql => value.replace('\\', "\\\\").replace('\'', "''"),
            DbType::Postgres | DbType::Sqlite => value.replace('\'', "''"),
        };
        format!("'{}'", escaped)
    }

    /// SQL text for a DEFAULT clause; `None` when there is no default.
    pub fn default_sql(&self, default: &DefaultValue) -> Option<String> {
        match default {
            DefaultValue::Absent => None,
            DefaultValue::Number(n) => Some(n.to_string()),
            DefaultValue::Text(s) => Some(self.literal(s)),
        }
    }

    /// Type, default and (MySQL) inline comment, without the column name.
    pub fn column_spec(&self, rule: &FieldRule) -> String {
        let mut sql = column_type(self.dialect, rule.field_type, rule.length());
        if let Some(default) = self.default_sql(&rule.default) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default);
        }
        if self.dialect == DbType::MySql && !rule.name.is_empty() {
            sql.push_str(" COMMENT ");
            sql.push_str(&self.literal(&rule.name));
        }
        sql
    }

    pub fn column_definition(&self, field: &str, rule: &FieldRule) -> String {
        format!("{} {}", self.quote(field), self.column_spec(rule))
    }

    pub fn business_column_defs(&self, fields: &[(String, FieldRule)]) -> Vec<String> {
        fields
            .iter()
            .map(|(field, rule)| self.column_definition(field, rule))
            .collect()
    }

    pub fn create_table_sql(&self, fields: &[(String, FieldRule)], comment: Option<&str>) -> String {
        let columns: Vec<String> = self
            .system_column_defs()
            .into_iter()
            .chain(self.business_column_defs(fields))
            .map(|def| format!("  {}", def))
            .collect();

        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote(self.table),
            columns.join(",\n")
        );
        if self.dialect == DbType::MySql {
            sql.push_str(&format!(
                " ENGINE={} DEFAULT CHARSET={}",
                self.options.mysql_engine, self.options.mysql_charset
            ));
            if let Some(comment) = comment {
                sql.push_str(&format!(" COMMENT={}", self.literal(comment)));
            }
        }
        sql
    }

    /// One ADD COLUMN or MODIFY/ALTER COLUMN fragment.
    ///
    /// Returns `None` when the dialect cannot alter an existing column in place.
    pub fn ddl_clause(&self, field: &str, rule: &FieldRule, is_new: bool) -> Option<String> {
        if is_new {
            return Some(format!("ADD COLUMN {}", self.column_definition(field, rule)));
        }
        match self.dialect {
            DbType::MySql => Some(format!("MODIFY COLUMN {}", self.column_definition(field, rule))),
            DbType::Postgres => Some(format!(
                "ALTER COLUMN {} TYPE {}",
                self.quote(field),
                column_type(self.dialect, rule.field_type, rule.length())
            )),
            DbType::Sqlite => None,
        }
    }

    /// True when a MODIFY clause restates the whole column, default included.
    pub fn modify_restates_default(&self) -> bool {
        self.dialect == DbType::MySql
    }

    /// SET/DROP DEFAULT fragment, if the dialect allows it for this column.
    ///
    /// MySQL text-family columns cannot carry defaults; SQLite cannot alter them.
    pub fn default_clause(&self, field: &str, rule: &FieldRule, physical: &str) -> Option<String> {
        match self.dialect {
            DbType::Sqlite => None,
            DbType::MySql if is_text_family(physical) => None,
            DbType::MySql | DbType::Postgres => {
                let column = self.quote(field);
                Some(match self.default_sql(&rule.default) {
                    Some(default) => format!("ALTER COLUMN {} SET DEFAULT {}", column, default),
                    None => format!("ALTER COLUMN {} DROP DEFAULT", column),
                })
            }
        }
    }

    pub fn index_sql(&self, index_name: &str, column: &str, action: IndexOp) -> String {
        match (action, self.dialect) {
            (IndexOp::Create, _) => format!(
                "CREATE INDEX {} ON {} ({})",
                self.quote(index_name),
                self.quote(self.table),
                self.quote(column)
            ),
            (IndexOp::Drop, DbType::MySql) => format!(
                "DROP INDEX {} ON {}",
                self.quote(index_name),
                self.quote(self.table)
            ),
            (IndexOp::Drop, DbType::Postgres | DbType::Sqlite) => {
                format!("DROP INDEX {}", self.quote(index_name))
            }
        }
    }

    /// PostgreSQL `COMMENT ON COLUMN`.
    pub fn column_comment_sql(&self, column: &str, comment: &str) -> String {
        format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.quote(self.table),
            self.quote(column),
            self.literal(comment)
        )
    }

    /// PostgreSQL `COMMENT ON TABLE`.
    pub fn table_comment_sql(&self, comment: &str) -> String {
        format!(
            "COMMENT ON TABLE {} IS {}",
            self.quote(self.table),
            self.literal(comment)
        )
    }
}
