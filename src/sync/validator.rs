//! Field-scoped validation of table definitions.

use crate::errors::RuleError;
use crate::models::connections::DbType;
use crate::models::definition::TableDefinition;
use crate::models::rule::FieldRule;

use super::rule_parser::parse_rule;
use super::type_map::max_varchar_length;

/// Columns owned by the engine; never declared by a definition.
pub const SYSTEM_FIELDS: [&str; 5] = ["id", "created_at", "updated_at", "deleted_at", "state"];

pub fn is_reserved(field: &str) -> bool {
    SYSTEM_FIELDS.contains(&field)
}

/// Parses and validates one field.
pub fn validate_field(
    table: &str,
    field: &str,
    raw: &str,
    dialect: DbType,
) -> Result<FieldRule, RuleError> {
    if is_reserved(field) {
        return Err(RuleError::new(
            table,
            field,
            "reserved column key, owned by the system",
        ));
    }
    let rule = parse_rule(table, field, raw)?;
    check_rule(table, field, &rule, dialect)?;
    Ok(rule)
}

/// Validates every field of a definition, reporting each bad field.
pub fn validate_definition(def: &TableDefinition, dialect: DbType) -> Vec<RuleError> {
    let mut errors = Vec::new();
    let mut seen = std::collections::HashSet::new();

    if def.table.trim().is_empty() {
        errors.push(RuleError::new(&def.table, "", "table name is empty"));
    }
    for (field, raw) in &def.fields {
        if !seen.insert(field.as_str()) {
            errors.push(RuleError::new(&def.table, field, "duplicate column key"));
            continue;
        }
        if let Err(err) = validate_field(&def.table, field, raw, dialect) {
            errors.push(err);
        }
    }
    errors
}

fn check_rule(table: &str, field: &str, rule: &FieldRule, dialect: DbType) -> Result<(), RuleError> {
    let fail = |reason: String| Err(RuleError::new(table, field, reason));

    if rule.field_type.is_text() {
        if rule.min.is_some() || rule.max.is_some() {
            return fail(format!("{} fields cannot declare min/max", rule.field_type));
        }
        if !rule.default.is_absent() {
            return fail(format!("{} fields cannot declare a default", rule.field_type));
        }
    }

    if rule.field_type.is_bounded() {
        let limit = max_varchar_length(dialect);
        match rule.length() {
            None => {
                return fail(format!(
                    "{} fields need a positive integer max",
                    rule.field_type
                ))
            }
            Some(length) if length > limit => {
                return fail(format!(
                    "max {} exceeds the {} varchar limit of {}",
                    length,
                    dialect.name(),
                    limit
                ))
            }
            Some(_) => {}
        }
    }

    if let (Some(min), Some(max)) = (rule.min, rule.max) {
        if min > max {
            return fail(format!("min {} is greater than max {}", min, max));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_keys_rejected() {
        for key in SYSTEM_FIELDS {
            let err = validate_field("user", key, "x|string|0|10|null|0|null", DbType::MySql)
                .unwrap_err();
            assert!(err.reason.contains("reserved"));
        }
    }

    #[test]
    fn test_text_forbids_bounds_and_default() {
        assert!(validate_field("t", "body", "正文|text|null|null|null|0|null", DbType::MySql).is_ok());
        assert!(validate_field("t", "body", "正文|text|0|null|null|0|null", DbType::MySql).is_err());
        assert!(validate_field("t", "body", "正文|array_text|null|null|x|0|null", DbType::Postgres).is_err());
    }

    #[test]
    fn test_string_max_limits() {
        assert!(validate_field("t", "s", "s|string|0|16383|null|0|null", DbType::MySql).is_ok());
        assert!(validate_field("t", "s", "s|string|0|16384|null|0|null", DbType::MySql).is_err());
        assert!(validate_field("t", "s", "s|string|0|16384|null|0|null", DbType::Postgres).is_ok());
        assert!(validate_field("t", "s", "s|string|0|null|null|0|null", DbType::Sqlite).is_err());
        assert!(validate_field("t", "s", "s|array|0|0|null|0|null", DbType::Sqlite).is_err());
        assert!(validate_field("t", "s", "s|string|0|12.5|null|0|null", DbType::Sqlite).is_err());
    }

    #[test]
    fn test_min_above_max() {
        let err = validate_field("t", "n", "n|number|10|1|null|0|null", DbType::MySql).unwrap_err();
        assert!(err.reason.contains("greater than"));
    }

    #[test]
    fn test_fractional_number_default() {
        assert!(validate_field("t", "n", "n|number|null|null|1.5|0|null", DbType::MySql).is_err());
    }

    #[test]
    fn test_definition_reports_every_bad_field() {
        let def = TableDefinition::new(
            "user",
            &[
                ("id", "主键|number|null|null|null|0|null"),
                ("email", "邮箱|string|0|150|null|1|null"),
                ("bio", "简介|text|0|10|null|0|null"),
                ("age", "年龄|number|0|x|null|0|null"),
            ],
        );

        let errors = validate_definition(&def, DbType::MySql);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["id", "bio", "age"]);
    }
}
