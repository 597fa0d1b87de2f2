//! Compares one live column against its desired rule.

use crate::models::connections::DbType;
use crate::models::plan::{ChangeKind, FieldChange};
use crate::models::rule::FieldRule;
use crate::models::schema::ColumnInfo;

use super::type_map::{physical_type, same_type};

pub struct DiffContext {
    pub dialect: DbType,
    /// PostgreSQL column comments are reconciled.
    pub comments: bool,
}

/// Emission order is not significant; callers key off `ChangeKind`.
pub fn compare(ctx: &DiffContext, existing: &ColumnInfo, rule: &FieldRule) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    let desired_type = physical_type(ctx.dialect, rule.field_type);

    if !same_type(&existing.data_type, desired_type) {
        changes.push(FieldChange::new(
            ChangeKind::Datatype,
            existing.data_type.clone(),
            desired_type,
        ));
    }

    if let Some(length) = rule.length() {
        if existing.length != Some(length) {
            changes.push(FieldChange::new(
                ChangeKind::Length,
                existing
                    .length
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "NULL".to_string()),
                length.to_string(),
            ));
        }
    }

    if !rule.default.matches(existing.default.as_deref()) {
        changes.push(FieldChange::new(
            ChangeKind::Default,
            existing.default.clone().unwrap_or_else(|| "NULL".to_string()),
            rule.default.to_string(),
        ));
    }

    if ctx.dialect == DbType::Postgres
        && ctx.comments
        && existing.comment.as_deref().unwrap_or_default() != rule.name
    {
        changes.push(FieldChange::new(
            ChangeKind::Comment,
            existing.comment.clone().unwrap_or_default(),
            rule.name.clone(),
        ));
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::rule_parser::parse_rule;

    fn ctx(dialect: DbType) -> DiffContext {
        DiffContext {
            dialect,
            comments: true,
        }
    }

    fn kinds(changes: &[FieldChange]) -> Vec<ChangeKind> {
        changes.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn test_length_widening() {
        let rule = parse_rule("user", "email", "邮箱|string|0|150|null|0|null").unwrap();
        let existing = ColumnInfo::new("varchar", Some(100));

        let changes = compare(&ctx(DbType::MySql), &existing, &rule);
        assert_eq!(
            changes,
            vec![FieldChange::new(ChangeKind::Length, "100", "150")]
        );
    }

    #[test]
    fn test_identical_column_has_no_changes() {
        let rule = parse_rule("user", "age", "年龄|number|0|200|18|0|null").unwrap();
        let existing = ColumnInfo::new("bigint", None).with_default("18");
        assert!(compare(&ctx(DbType::MySql), &existing, &rule).is_empty());
    }

    #[test]
    fn test_numeric_default_compare() {
        let rule = parse_rule("user", "age", "年龄|number|0|200|18|0|null").unwrap();
        let existing = ColumnInfo::new("INTEGER", None).with_default("18.0");
        assert!(compare(&ctx(DbType::Sqlite), &existing, &rule).is_empty());

        let existing = ColumnInfo::new("INTEGER", None).with_default("20");
        let changes = compare(&ctx(DbType::Sqlite), &existing, &rule);
        assert_eq!(
            changes,
            vec![FieldChange::new(ChangeKind::Default, "20", "18")]
        );
    }

    #[test]
    fn test_length_and_default_together() {
        let rule = parse_rule("user", "nick", "昵称|string|0|64|anon|0|null").unwrap();
        let existing = ColumnInfo::new("varchar", Some(32));
        let changes = compare(&ctx(DbType::MySql), &existing, &rule);
        assert_eq!(kinds(&changes), vec![ChangeKind::Length, ChangeKind::Default]);
    }

    #[test]
    fn test_datatype_change() {
        let rule = parse_rule("user", "code", "编码|string|0|32|null|0|null").unwrap();
        let existing = ColumnInfo::new("bigint", None);
        let changes = compare(&ctx(DbType::MySql), &existing, &rule);
        assert_eq!(changes[0], FieldChange::new(ChangeKind::Datatype, "bigint", "VARCHAR"));
        assert_eq!(kinds(&changes), vec![ChangeKind::Datatype, ChangeKind::Length]);
    }

    #[test]
    fn test_comment_only_under_postgres() {
        let rule = parse_rule("user", "email", "邮箱|string|0|100|null|0|null").unwrap();
        let existing = ColumnInfo::new("character varying", Some(100)).with_comment("email");

        let pg = compare(&ctx(DbType::Postgres), &existing, &rule);
        assert_eq!(
            pg,
            vec![FieldChange::new(ChangeKind::Comment, "email", "邮箱")]
        );

        assert!(compare(&ctx(DbType::MySql), &existing, &rule).is_empty());

        let off = DiffContext {
            dialect: DbType::Postgres,
            comments: false,
        };
        assert!(compare(&off, &existing, &rule).is_empty());
    }

    #[test]
    fn test_text_family_equivalence() {
        let rule = parse_rule("post", "body", "正文|text|null|null|null|0|null").unwrap();
        let existing = ColumnInfo::new("mediumtext", Some(16_777_215));
        assert!(compare(&ctx(DbType::MySql), &existing, &rule).is_empty());
    }
}
