//! Parser for the seven-position column rule string:
//! `name|type|min|max|default|index|regex`.

use crate::errors::RuleError;
use crate::models::rule::{DefaultValue, FieldRule, FieldType};

/// Token standing for "no value" in min, max, default and regex.
pub const NULL_TOKEN: &str = "null";

const RULE_ARITY: usize = 7;

pub fn parse_rule(table: &str, field: &str, raw: &str) -> Result<FieldRule, RuleError> {
    // The regex is last and may itself contain the separator.
    let parts: Vec<&str> = raw.splitn(RULE_ARITY, '|').collect();
    if parts.len() != RULE_ARITY {
        return Err(RuleError::new(
            table,
            field,
            format!(
                "expected {} `|`-separated parts, found {}",
                RULE_ARITY,
                parts.len()
            ),
        ));
    }

    let name = parts[0].trim().to_string();
    let field_type = FieldType::parse(parts[1].trim()).ok_or_else(|| {
        RuleError::new(table, field, format!("unknown type `{}`", parts[1].trim()))
    })?;
    let min = parse_bound(table, field, "min", parts[2])?;
    let max = parse_bound(table, field, "max", parts[3])?;
    let default = parse_default(table, field, field_type, parts[4])?;
    let index = match parts[5].trim() {
        "0" => false,
        "1" => true,
        other => {
            return Err(RuleError::new(
                table,
                field,
                format!("index flag must be 0 or 1, found `{}`", other),
            ))
        }
    };
    let regex = match parts[6] {
        NULL_TOKEN => None,
        pattern => Some(pattern.to_string()),
    };

    Ok(FieldRule {
        name,
        field_type,
        min,
        max,
        default,
        index,
        regex,
    })
}

fn parse_bound(table: &str, field: &str, what: &str, token: &str) -> Result<Option<f64>, RuleError> {
    let token = token.trim();
    if token == NULL_TOKEN {
        return Ok(None);
    }
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Some)
        .ok_or_else(|| RuleError::new(table, field, format!("{} `{}` is not a number", what, token)))
}

fn parse_default(
    table: &str,
    field: &str,
    field_type: FieldType,
    token: &str,
) -> Result<DefaultValue, RuleError> {
    if token.trim() == NULL_TOKEN {
        return Ok(DefaultValue::Absent);
    }
    match field_type {
        FieldType::Number => {
            let token = token.trim();
            if let Ok(value) = token.parse::<i64>() {
                return Ok(DefaultValue::Number(value));
            }
            let reason = match token.parse::<f64>() {
                Ok(value) if value.is_finite() => {
                    format!("number default `{}` must be an integer", token)
                }
                _ => format!("default `{}` is not a number", token),
            };
            Err(RuleError::new(table, field, reason))
        }
        _ => Ok(DefaultValue::Text(token.to_string())),
    }
}
