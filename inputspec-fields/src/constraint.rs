//! Constraint descriptors attached to a field.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of a constraint. Wire tags are matched case-insensitively; a tag this
/// version does not know is kept verbatim in `Unknown` so it can round-trip
/// and be looked up among registered custom evaluators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConstraintType {
    Pattern,
    MinLength,
    MaxLength,
    MinValue,
    MaxValue,
    MinDate,
    MaxDate,
    Range,
    StringLength,
    Custom,
    Unknown(String),
}

impl ConstraintType {
    /// Every built-in kind, in wire-tag order.
    pub const BUILT_IN: [ConstraintType; 10] = [
        ConstraintType::Pattern,
        ConstraintType::MinLength,
        ConstraintType::MaxLength,
        ConstraintType::MinValue,
        ConstraintType::MaxValue,
        ConstraintType::MinDate,
        ConstraintType::MaxDate,
        ConstraintType::Range,
        ConstraintType::StringLength,
        ConstraintType::Custom,
    ];

    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "pattern" => ConstraintType::Pattern,
            "minlength" => ConstraintType::MinLength,
            "maxlength" => ConstraintType::MaxLength,
            "minvalue" => ConstraintType::MinValue,
            "maxvalue" => ConstraintType::MaxValue,
            "mindate" => ConstraintType::MinDate,
            "maxdate" => ConstraintType::MaxDate,
            "range" => ConstraintType::Range,
            "stringlength" => ConstraintType::StringLength,
            "custom" => ConstraintType::Custom,
            _ => ConstraintType::Unknown(tag.to_string()),
        }
    }

    /// Canonical wire tag.
    pub fn tag(&self) -> &str {
        match self {
            ConstraintType::Pattern => "pattern",
            ConstraintType::MinLength => "minLength",
            ConstraintType::MaxLength => "maxLength",
            ConstraintType::MinValue => "minValue",
            ConstraintType::MaxValue => "maxValue",
            ConstraintType::MinDate => "minDate",
            ConstraintType::MaxDate => "maxDate",
            ConstraintType::Range => "range",
            ConstraintType::StringLength => "stringLength",
            ConstraintType::Custom => "custom",
            ConstraintType::Unknown(tag) => tag,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ConstraintType::Unknown(_))
    }
}

impl From<String> for ConstraintType {
    fn from(tag: String) -> Self {
        ConstraintType::from_tag(&tag)
    }
}

impl From<ConstraintType> for String {
    fn from(kind: ConstraintType) -> Self {
        kind.tag().to_string()
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A named rule applied to a field's value.
///
/// `params` is an open JSON bag whose shape depends on `kind`:
///
/// | kind | params |
/// |------|--------|
/// | `pattern` | `{"regex": "...", "flags": "i"}` |
/// | `minLength` / `maxLength` / `minValue` / `maxValue` | `{"value": n}` |
/// | `minDate` / `maxDate` | `{"iso": "2024-01-01"}` |
/// | `range` | `{"min": a, "max": b, "step": s}` |
/// | `stringLength` | `{"min": n, "max": m}` |
/// | `custom` | `{"key": "..."}` plus evaluator-specific entries |
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ConstraintType,
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ConstraintDescriptor {
    pub fn new(name: impl Into<String>, kind: ConstraintType, params: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            params,
            error_message: None,
            description: None,
        }
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A named entry of the parameter bag.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Key used to find a registered custom evaluator: `params.key` when
    /// present, otherwise the raw tag of an unknown kind.
    pub fn custom_key(&self) -> Option<&str> {
        match self.param("key").and_then(Value::as_str) {
            Some(key) => Some(key),
            None => match &self.kind {
                ConstraintType::Unknown(tag) => Some(tag),
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tags_match_case_insensitively() {
        assert_eq!(ConstraintType::from_tag("MINLENGTH"), ConstraintType::MinLength);
        assert_eq!(ConstraintType::from_tag("minLength"), ConstraintType::MinLength);
        assert_eq!(ConstraintType::from_tag("Range"), ConstraintType::Range);
    }

    #[test]
    fn test_unknown_tag_is_preserved() {
        let descriptor: ConstraintDescriptor = serde_json::from_value(json!({
            "name": "checksum",
            "type": "luhn",
            "params": {}
        }))
        .unwrap();
        assert_eq!(descriptor.kind, ConstraintType::Unknown("luhn".into()));
        assert_eq!(descriptor.custom_key(), Some("luhn"));

        let back = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(back["type"], "luhn");
        assert!(back.get("errorMessage").is_none());
    }

    #[test]
    fn test_canonical_tags_round_trip_through_serde() {
        for kind in ConstraintType::BUILT_IN {
            let json = serde_json::to_value(&kind).unwrap();
            let back: ConstraintType = serde_json::from_value(json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn test_custom_key_prefers_params() {
        let descriptor = ConstraintDescriptor::new(
            "vat",
            ConstraintType::Custom,
            json!({"key": "vat-number", "country": "FR"}),
        )
        .with_error_message("Invalid VAT number");
        assert_eq!(descriptor.custom_key(), Some("vat-number"));
        assert_eq!(descriptor.param("country"), Some(&json!("FR")));
        assert_eq!(descriptor.error_message.as_deref(), Some("Invalid VAT number"));
    }

    #[test]
    fn test_missing_params_default_to_null() {
        let descriptor: ConstraintDescriptor =
            serde_json::from_value(json!({"name": "c", "type": "custom"})).unwrap();
        assert!(descriptor.params.is_null());
        assert_eq!(descriptor.custom_key(), None);
    }
}
