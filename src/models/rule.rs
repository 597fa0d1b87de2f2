use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical field type declared in a rule string.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Text,
    ArrayString,
    ArrayText,
}

impl FieldType {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "text" => Some(FieldType::Text),
            "array" | "array_string" => Some(FieldType::ArrayString),
            "array_text" => Some(FieldType::ArrayText),
            _ => None,
        }
    }

    /// Bounded types store `max` as the physical VARCHAR length.
    pub fn is_bounded(&self) -> bool {
        matches!(self, FieldType::String | FieldType::ArrayString)
    }

    /// Large-text types: no bounds, no default.
    pub fn is_text(&self) -> bool {
        matches!(self, FieldType::Text | FieldType::ArrayText)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Text => "text",
            FieldType::ArrayString => "array",
            FieldType::ArrayText => "array_text",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired column default.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum DefaultValue {
    Absent,
    Number(i64),
    Text(String),
}

impl DefaultValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, DefaultValue::Absent)
    }

    /// Compares against a normalized introspected default.
    pub fn matches(&self, current: Option<&str>) -> bool {
        match (self, current) {
            (DefaultValue::Absent, None) => true,
            (DefaultValue::Number(n), Some(raw)) => {
                let raw = raw.trim();
                // DECIMAL-style reports such as `10.00`
                let integral = match raw.split_once('.') {
                    Some((int, frac)) if frac.chars().all(|c| c == '0') => int,
                    Some(_) => return false,
                    None => raw,
                };
                integral.parse::<i64>().map(|value| value == *n).unwrap_or(false)
            }
            (DefaultValue::Text(s), Some(raw)) => s == raw,
            _ => false,
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Absent => f.write_str("NULL"),
            DefaultValue::Number(n) => write!(f, "{}", n),
            DefaultValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// One column's desired shape, parsed from a rule string.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FieldRule {
    /// Human label, used for column comments.
    pub name: String,
    pub field_type: FieldType,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: DefaultValue,
    pub index: bool,
    /// Validation pattern; carried along but irrelevant to DDL.
    pub regex: Option<String>,
}

impl FieldRule {
    /// Physical length for bounded types.
    pub fn length(&self) -> Option<u64> {
        if !self.field_type.is_bounded() {
            return None;
        }
        self.max
            .filter(|max| *max >= 1.0 && max.fract() == 0.0)
            .map(|max| max as u64)
    }
}
