//! End-to-end validation of JSON field specifications

use inputspec_fields::{
    ConstraintDescriptor, ConstraintRegistry, ConstraintType, DataType, FieldSpec, FieldValidator, FieldsError,
    FieldsResponse, InputSpec, ValidationOptions, MEMBERSHIP, REQUIRED, TYPE,
};
use serde_json::{json, Value};

fn field(json: Value) -> FieldSpec {
    let spec: FieldSpec = serde_json::from_value(json).unwrap();
    spec.check().unwrap();
    spec
}

#[test_log::test]
fn test_uppercase_code_example() {
    let spec = field(json!({
        "displayName": "Code",
        "dataType": "STRING",
        "expectMultipleValues": false,
        "required": true,
        "constraints": [
            {"name": "syntax", "type": "pattern", "params": {"regex": "^[A-Z]+$"}}
        ]
    }));
    let validator = FieldValidator::new();

    let rejected = validator.validate(&spec, &json!("abc"));
    assert_eq!(
        serde_json::to_value(&rejected).unwrap(),
        json!({
            "isValid": false,
            "errors": [{"constraintName": "syntax", "message": "Invalid format", "value": "abc"}]
        })
    );

    let accepted = validator.validate(&spec, &json!("ABC"));
    assert_eq!(
        serde_json::to_value(&accepted).unwrap(),
        json!({"isValid": true, "errors": []})
    );
}

#[test_log::test]
fn test_closed_inline_list_membership() {
    let spec = field(json!({
        "displayName": "Letters",
        "dataType": "STRING",
        "expectMultipleValues": true,
        "required": false,
        "constraints": [],
        "valuesEndpoint": {
            "protocol": "INLINE",
            "mode": "CLOSED",
            "items": [{"value": "A", "label": "A"}, {"value": "B", "label": "B"}]
        }
    }));

    let result = FieldValidator::new().validate(&spec, &json!(["A", "X", "B", "Z"]));
    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().all(|e| e.constraint_name == MEMBERSHIP));
    let indices: Vec<_> = result.errors.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![Some(1), Some(3)]);
    assert_eq!(result.errors[0].value, Some(json!("X")));
}

#[test_log::test]
fn test_legacy_strict_mode_is_closed() {
    let spec = field(json!({
        "displayName": "Letters",
        "dataType": "STRING",
        "valuesEndpoint": {
            "protocol": "INLINE",
            "mode": "STRICT",
            "items": [{"value": "A", "label": "A"}]
        }
    }));
    let result = FieldValidator::new().validate(&spec, &json!("Q"));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].constraint_name, MEMBERSHIP);
    assert_eq!(result.errors[0].index, None);
}

#[test_log::test]
fn test_large_integer_ids_compare_exactly() {
    let spec = field(json!({
        "displayName": "Account",
        "dataType": "NUMBER",
        "valuesEndpoint": {
            "protocol": "INLINE",
            "mode": "CLOSED",
            "items": [{"value": 1234567890123456789_u64, "label": "Main"}]
        },
        "constraints": [
            {"name": "floor", "type": "minValue", "params": {"value": 9007199254740993_u64}}
        ]
    }));
    let validator = FieldValidator::new();

    assert!(validator.validate(&spec, &json!(1234567890123456789_u64)).is_valid);

    let neighbour = validator.validate(&spec, &json!(1234567890123456788_u64));
    assert!(!neighbour.is_valid);
    assert_eq!(neighbour.errors[0].constraint_name, MEMBERSHIP);

    let below_floor = FieldValidator::new().validate(
        &FieldSpec::new("Account", DataType::Number).with_constraints(vec![
            ConstraintDescriptor::new(
                "floor",
                ConstraintType::MinValue,
                json!({"value": 9007199254740993_u64}),
            ),
        ]),
        &json!(9007199254740992_u64),
    );
    assert!(!below_floor.is_valid);
    assert_eq!(below_floor.errors[0].message, "Minimum value is 9007199254740993");
}

#[test_log::test]
fn test_number_field_with_bounds() {
    let spec = field(json!({
        "displayName": "Age",
        "dataType": "NUMBER",
        "required": true,
        "constraints": [
            {"name": "adult", "type": "minValue", "params": {"value": 18}, "errorMessage": "Must be an adult"},
            {"name": "plausible", "type": "maxValue", "params": {"value": 130}}
        ]
    }));
    let validator = FieldValidator::new();

    assert!(validator.validate(&spec, &json!(42)).is_valid);
    assert!(validator.validate(&spec, &json!(18.0)).is_valid);

    let young = validator.validate(&spec, &json!(12));
    assert_eq!(young.errors.len(), 1);
    assert_eq!(young.errors[0].message, "Must be an adult");

    let ancient = validator.validate(&spec, &json!(200));
    assert_eq!(ancient.errors[0].message, "Maximum value is 130");

    let missing = validator.validate(&spec, &Value::Null);
    assert_eq!(missing.errors[0].constraint_name, REQUIRED);
    assert!(missing.errors[0].value.is_none());

    let wrong = validator.validate(&spec, &json!(true));
    assert_eq!(wrong.errors[0].constraint_name, TYPE);
}

#[test_log::test]
fn test_list_of_numbers_value_bounds_apply_per_element() {
    let spec = field(json!({
        "displayName": "Scores",
        "dataType": "NUMBER",
        "expectMultipleValues": true,
        "constraints": [
            {"name": "floor", "type": "minValue", "params": {"value": 0}},
            {"name": "size", "type": "maxLength", "params": {"value": 3}}
        ]
    }));
    let result = FieldValidator::new().validate(&spec, &json!([5, -1, 7, -3]));
    let named: Vec<_> = result
        .errors
        .iter()
        .map(|e| (e.constraint_name.as_str(), e.index))
        .collect();
    assert_eq!(
        named,
        vec![("floor", Some(1)), ("floor", Some(3)), ("size", None)]
    );
}

#[test_log::test]
fn test_single_string_length_constraints() {
    let spec = field(json!({
        "displayName": "Nickname",
        "dataType": "STRING",
        "constraints": [
            {"name": "ignored", "type": "minLength", "params": {"value": 50}},
            {"name": "chars", "type": "stringLength", "params": {"min": 2, "max": 5}}
        ]
    }));
    let validator = FieldValidator::new();
    assert!(validator.validate(&spec, &json!("Bob")).is_valid);

    let long = validator.validate(&spec, &json!("Bartholomew"));
    assert_eq!(long.errors.len(), 1);
    assert_eq!(long.errors[0].constraint_name, "chars");
}

#[test_log::test]
fn test_date_field_range() {
    let spec = field(json!({
        "displayName": "Start",
        "dataType": "DATE",
        "constraints": [
            {"name": "window", "type": "range", "params": {"min": "2024-01-01", "max": "2024-12-31"}},
            {"name": "after", "type": "minDate", "params": {"iso": "2024-03-01T00:00:00Z"}}
        ]
    }));
    let validator = FieldValidator::new();
    assert!(validator.validate(&spec, &json!("2024-06-15")).is_valid);
    assert!(validator.validate(&spec, &json!("2024-12-31T00:00:00+00:00")).is_valid);

    let early = validator.validate(&spec, &json!("2024-02-01"));
    assert_eq!(early.errors.len(), 1);
    assert_eq!(early.errors[0].constraint_name, "after");

    let late = validator.validate_with(
        &spec,
        &json!("2025-01-01"),
        ValidationOptions::short_circuit(),
    );
    assert_eq!(late.errors.len(), 1);
    assert_eq!(late.errors[0].constraint_name, "window");
}

#[test_log::test]
fn test_unknown_type_round_trips_and_passes() {
    let raw = json!({
        "displayName": "Card",
        "dataType": "STRING",
        "expectMultipleValues": false,
        "required": false,
        "constraints": [
            {"name": "checksum", "type": "luhn", "params": {"mod": 10}}
        ]
    });
    let spec = field(raw.clone());
    assert!(FieldValidator::new().validate(&spec, &json!("4111")).is_valid);
    assert_eq!(serde_json::to_value(&spec).unwrap(), raw);
}

#[test_log::test]
fn test_host_evaluator_intercepts_unknown_type() {
    let spec = field(json!({
        "displayName": "Card",
        "dataType": "STRING",
        "constraints": [
            {"name": "checksum", "type": "luhn", "params": {}, "errorMessage": "Bad card number"}
        ]
    }));
    let mut registry = ConstraintRegistry::new();
    registry.register_custom("luhn", |_: &ConstraintDescriptor, v: &Value| {
        let digits: Option<Vec<u32>> = v
            .as_str()
            .and_then(|s| s.chars().rev().map(|c| c.to_digit(10)).collect());
        let Some(digits) = digits else {
            return Err("not numeric".to_string());
        };
        let sum: u32 = digits
            .iter()
            .enumerate()
            .map(|(i, d)| if i % 2 == 1 { let x = d * 2; if x > 9 { x - 9 } else { x } } else { *d })
            .sum();
        if sum % 10 == 0 {
            Ok(())
        } else {
            Err("checksum mismatch".to_string())
        }
    });
    let validator = FieldValidator::with_registry(registry);

    assert!(validator.validate(&spec, &json!("4111111111111111")).is_valid);
    let bad = validator.validate(&spec, &json!("4111111111111112"));
    assert_eq!(bad.errors[0].message, "Bad card number");
}

#[test]
fn test_duplicate_constraint_names_rejected_on_load() {
    let doc = r#"{
        "protocolVersion": "2.0",
        "fields": [{
            "displayName": "Code",
            "dataType": "STRING",
            "constraints": [
                {"name": "c", "type": "pattern", "params": {"regex": "a"}},
                {"name": "c", "type": "maxLength", "params": {"value": 2}}
            ]
        }]
    }"#;
    let err = InputSpec::from_json(doc).unwrap_err();
    assert!(matches!(err, FieldsError::DuplicateConstraintName { .. }));
}

#[test]
fn test_invalid_domain_rejected_on_load() {
    let doc = r#"{"fields": [{"displayName": "X", "dataType": "STRING",
        "valuesEndpoint": {"protocol": "INLINE", "items": []}}]}"#;
    assert!(matches!(
        InputSpec::from_json(doc),
        Err(FieldsError::InvalidDomain { .. })
    ));
}

#[test]
fn test_fields_response_envelope() {
    let response: FieldsResponse = serde_json::from_value(json!({
        "fields": [
            {"displayName": "A", "dataType": "BOOLEAN"},
            {"displayName": "B", "dataType": "NUMBER", "expectMultipleValues": true}
        ],
        "version": "2.0"
    }))
    .unwrap();
    assert_eq!(response.fields.len(), 2);
    assert!(response.fields[1].expect_multiple_values);
    assert_eq!(response.version.as_deref(), Some("2.0"));

    let validator = FieldValidator::new();
    assert!(validator.validate(&response.fields[0], &json!(false)).is_valid);
    assert!(!validator.validate(&response.fields[1], &json!([1, "2"])).is_valid);
}
