use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Index name to the ordered list of columns it covers.
pub type IndexInfo = BTreeMap<String, Vec<String>>;

/// A live table, as introspected at the start of one reconciliation pass.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: BTreeMap<String, ColumnInfo>,
    pub indexes: IndexInfo,
}

impl TableSchema {
    /// True if `index_name` exists and covers exactly `column`.
    pub fn has_single_column_index(&self, index_name: &str, column: &str) -> bool {
        self.indexes
            .get(index_name)
            .map(|columns| columns.len() == 1 && columns[0] == column)
            .unwrap_or(false)
    }
}

/// One live column.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ColumnInfo {
    /// Raw dialect type, e.g. `varchar`, `character varying`, `VARCHAR(100)`.
    pub data_type: String,
    pub length: Option<u64>,
    pub is_nullable: bool,
    /// Normalized default: unquoted, without casts, `None` for no default.
    pub default: Option<String>,
    /// PostgreSQL only.
    pub comment: Option<String>,
}

impl ColumnInfo {
    pub fn new(data_type: &str, length: Option<u64>) -> Self {
        Self {
            data_type: data_type.to_string(),
            length,
            is_nullable: true,
            default: None,
            comment: None,
        }
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_column_index() {
        let mut schema = TableSchema::default();
        schema
            .indexes
            .insert("idx_user_email".to_string(), vec!["email".to_string()]);
        schema.indexes.insert(
            "idx_user_name".to_string(),
            vec!["name".to_string(), "email".to_string()],
        );

        assert!(schema.has_single_column_index("idx_user_email", "email"));
        assert!(!schema.has_single_column_index("idx_user_email", "name"));
        assert!(!schema.has_single_column_index("idx_user_name", "name"));
        assert!(!schema.has_single_column_index("idx_missing", "email"));
    }
}
