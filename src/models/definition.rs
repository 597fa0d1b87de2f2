use std::{fmt, fs, path::Path};

use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};

use crate::errors::DbError;

/// One application table: its name and a rule string per business column.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TableDefinition {
    pub table: String,
    #[serde(default)]
    pub comment: Option<String>,
    /// Column key and raw rule string, in declaration order.
    #[serde(deserialize_with = "ordered_fields")]
    pub fields: Vec<(String, String)>,
}

impl TableDefinition {
    pub fn new(table: &str, fields: &[(&str, &str)]) -> Self {
        Self {
            table: table.to_string(),
            comment: None,
            fields: fields
                .iter()
                .map(|(key, rule)| (key.to_string(), rule.to_string()))
                .collect(),
        }
    }

    pub fn from_json(source: &str) -> Result<Self, DbError> {
        serde_json::from_str(source).map_err(|e| DbError::Definition(e.to_string()))
    }
}

/// Reads every `*.json` definition in `dir`, sorted by file name.
pub fn load_definitions(dir: &Path) -> Result<Vec<TableDefinition>, DbError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| DbError::Definition(format!("{}: {}", dir.display(), e)))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| DbError::Definition(e.to_string()))?
            .path();
        if path.extension().map(|ext| ext == "json").unwrap_or(false) {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let source = fs::read_to_string(path)
                .map_err(|e| DbError::Definition(format!("{}: {}", path.display(), e)))?;
            TableDefinition::from_json(&source).map_err(|e| match e {
                DbError::Definition(msg) => {
                    DbError::Definition(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })
        })
        .collect()
}

// A JSON object whose key order must survive deserialization.
fn ordered_fields<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FieldsVisitor;

    impl<'de> Visitor<'de> for FieldsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of column keys to rule strings")
        }

        fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, rule)) = access.next_entry::<String, String>()? {
                fields.push((key, rule));
            }
            Ok(fields)
        }
    }

    deserializer.deserialize_map(FieldsVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_keeps_field_order() {
        let def = TableDefinition::from_json(
            r#"{
                "table": "user",
                "comment": "用户",
                "fields": {
                    "nickname": "昵称|string|0|50|null|0|null",
                    "email": "邮箱|string|0|150|null|1|null",
                    "age": "年龄|number|0|150|0|0|null"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(def.table, "user");
        assert_eq!(def.comment.as_deref(), Some("用户"));
        let keys: Vec<&str> = def.fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["nickname", "email", "age"]);
    }

    #[test]
    fn test_from_json_rejects_non_string_rule() {
        let result = TableDefinition::from_json(r#"{"table": "t", "fields": {"a": 1}}"#);
        assert!(matches!(result, Err(DbError::Definition(_))));
    }

    #[test]
    fn test_load_definitions_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("b_order.json"),
            r#"{"table": "order", "fields": {"no": "单号|string|0|32|null|1|null"}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("a_user.json"),
            r#"{"table": "user", "fields": {}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let defs = load_definitions(dir.path()).unwrap();
        let tables: Vec<&str> = defs.iter().map(|d| d.table.as_str()).collect();
        assert_eq!(tables, vec!["user", "order"]);
    }

    #[test]
    fn test_load_definitions_reports_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();

        match load_definitions(dir.path()) {
            Err(DbError::Definition(msg)) => assert!(msg.contains("broken.json")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
