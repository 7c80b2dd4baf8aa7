//! Field validation pipeline.
//!
//! A candidate value passes through four ordered stages: required, type,
//! domain membership, then the field's constraints in declaration order.
//! Failures are returned as data in a [`ValidationResult`]; nothing here
//! performs I/O or panics on bad input.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::constraint::ConstraintDescriptor;
use crate::domain::DomainLookup;
use crate::registry::{ConstraintRegistry, FieldShape, Scope};
use crate::types::FieldSpec;
use crate::value::{is_empty, type_matches};

/// Error name for a missing mandatory value.
pub const REQUIRED: &str = "required";
/// Error name for a value of the wrong shape.
pub const TYPE: &str = "type";
/// Error name for a value outside a CLOSED domain.
pub const MEMBERSHIP: &str = "membership";

/// One failed rule instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub constraint_name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl ValidationError {
    pub fn new(
        constraint_name: impl Into<String>,
        message: impl Into<String>,
        value: &Value,
        index: Option<usize>,
    ) -> Self {
        Self {
            constraint_name: constraint_name.into(),
            message: message.into(),
            value: (!value.is_null()).then(|| value.clone()),
            index,
        }
    }
}

/// Outcome of validating one value: valid exactly when `errors` is empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn first_error(&self) -> Option<&ValidationError> {
        self.errors.first()
    }

    /// Errors raised under `name` (a constraint name or a stage name).
    pub fn errors_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors.iter().filter(move |e| e.constraint_name == name)
    }
}

/// Knobs for one validation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Stop at the first failing stage or constraint instead of collecting
    /// every error.
    pub short_circuit: bool,
}

impl ValidationOptions {
    pub fn short_circuit() -> Self {
        Self {
            short_circuit: true,
        }
    }
}

/// Runs the validation pipeline using a [`ConstraintRegistry`].
///
/// The validator holds no mutable state and can be shared freely across
/// threads.
#[derive(Debug, Default)]
pub struct FieldValidator {
    registry: ConstraintRegistry,
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a registry carrying host-specific custom evaluators.
    pub fn with_registry(registry: ConstraintRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ConstraintRegistry {
        &self.registry
    }

    /// Validate collecting every error.
    pub fn validate(&self, spec: &FieldSpec, value: &Value) -> ValidationResult {
        self.run(spec, value, ValidationOptions::default(), None)
    }

    pub fn validate_with(
        &self,
        spec: &FieldSpec,
        value: &Value,
        options: ValidationOptions,
    ) -> ValidationResult {
        self.run(spec, value, options, None)
    }

    /// Validate a field whose remote CLOSED domain has already been resolved
    /// by the caller; `lookup` answers membership for it.
    pub fn validate_against(
        &self,
        spec: &FieldSpec,
        value: &Value,
        options: ValidationOptions,
        lookup: &dyn DomainLookup,
    ) -> ValidationResult {
        self.run(spec, value, options, Some(lookup))
    }

    /// Only the required stage.
    pub fn validate_required(&self, spec: &FieldSpec, value: &Value) -> ValidationResult {
        if spec.required && is_empty(value) {
            ValidationResult::from_errors(vec![required_error(value)])
        } else {
            ValidationResult::valid()
        }
    }

    /// The required and type stages followed by the single constraint named
    /// `name`.
    pub fn validate_constraint(&self, spec: &FieldSpec, value: &Value, name: &str) -> ValidationResult {
        if let Some(done) = leading_stages(spec, value) {
            return done;
        }
        let Some(descriptor) = spec.constraint(name) else {
            return ValidationResult::from_errors(vec![ValidationError::new(
                name,
                format!("Constraint '{name}' not found"),
                value,
                None,
            )]);
        };
        let mut errors = Vec::new();
        self.evaluate(descriptor, FieldShape::from(spec), value, false, &mut errors);
        ValidationResult::from_errors(errors)
    }

    fn run(
        &self,
        spec: &FieldSpec,
        value: &Value,
        options: ValidationOptions,
        lookup: Option<&dyn DomainLookup>,
    ) -> ValidationResult {
        if let Some(done) = leading_stages(spec, value) {
            return done;
        }

        let mut errors = Vec::new();
        check_membership(spec, value, lookup, &mut errors);
        if options.short_circuit && !errors.is_empty() {
            return ValidationResult::from_errors(errors);
        }

        let shape = FieldShape::from(spec);
        for descriptor in &spec.constraints {
            let failed = self.evaluate(descriptor, shape, value, options.short_circuit, &mut errors);
            if failed && options.short_circuit {
                break;
            }
        }

        debug!(
            field = %spec.display_name,
            errors = errors.len(),
            "validated field"
        );
        ValidationResult::from_errors(errors)
    }

    /// Evaluate one constraint, appending its failures. Returns whether it
    /// failed at least once.
    fn evaluate(
        &self,
        descriptor: &ConstraintDescriptor,
        shape: FieldShape,
        value: &Value,
        stop_at_first: bool,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let compiled = match self.registry.compile(descriptor, shape) {
            Ok(compiled) => compiled,
            Err(err) => {
                warn!(
                    constraint = %descriptor.name,
                    kind = %descriptor.kind,
                    error = %err,
                    "malformed constraint parameters"
                );
                errors.push(failure(descriptor, err.to_string(), value, None));
                return true;
            }
        };

        let before = errors.len();
        match (shape.multiple, compiled.scope(), value.as_array()) {
            (true, Scope::PerElement, Some(items)) => {
                for (index, item) in items.iter().enumerate() {
                    if let Err(default) = compiled.test(descriptor, item) {
                        errors.push(failure(descriptor, default, item, Some(index)));
                        if stop_at_first {
                            break;
                        }
                    }
                }
            }
            _ => {
                if let Err(default) = compiled.test(descriptor, value) {
                    errors.push(failure(descriptor, default, value, None));
                }
            }
        }

        let failed = errors.len() > before;
        trace!(
            constraint = %descriptor.name,
            kind = %descriptor.kind,
            passed = !failed,
            "evaluated constraint"
        );
        failed
    }
}

/// Stages 1 and 2. `Some` when the result is already decided.
fn leading_stages(spec: &FieldSpec, value: &Value) -> Option<ValidationResult> {
    if is_empty(value) {
        return Some(if spec.required {
            ValidationResult::from_errors(vec![required_error(value)])
        } else {
            ValidationResult::valid()
        });
    }
    if !type_matches(spec.data_type, spec.expect_multiple_values, value) {
        let message = if spec.expect_multiple_values {
            format!("Expected array of {} type", spec.data_type.label())
        } else {
            format!("Expected {} type", spec.data_type.label())
        };
        return Some(ValidationResult::from_errors(vec![ValidationError::new(
            TYPE, message, value, None,
        )]));
    }
    None
}

fn check_membership(
    spec: &FieldSpec,
    value: &Value,
    lookup: Option<&dyn DomainLookup>,
    errors: &mut Vec<ValidationError>,
) {
    let Some(domain) = spec.values_endpoint.as_ref() else {
        return;
    };
    if !domain.is_closed() {
        return;
    }
    let oracle: &dyn DomainLookup = if domain.is_inline() {
        &domain.items
    } else if let Some(lookup) = lookup {
        lookup
    } else {
        debug!(
            field = %spec.display_name,
            uri = domain.uri.as_deref().unwrap_or_default(),
            "remote domain has no resolved values, skipping membership"
        );
        return;
    };

    match value.as_array().filter(|_| spec.expect_multiple_values) {
        Some(items) => {
            for (index, item) in items.iter().enumerate() {
                if !oracle.admits(item) {
                    errors.push(membership_error(item, Some(index)));
                }
            }
        }
        None => {
            if !oracle.admits(value) {
                errors.push(membership_error(value, None));
            }
        }
    }
}

fn required_error(value: &Value) -> ValidationError {
    ValidationError::new(REQUIRED, "This field is required", value, None)
}

fn membership_error(value: &Value, index: Option<usize>) -> ValidationError {
    ValidationError::new(MEMBERSHIP, "Invalid value selected", value, index)
}

fn failure(
    descriptor: &ConstraintDescriptor,
    default: String,
    value: &Value,
    index: Option<usize>,
) -> ValidationError {
    let message = descriptor.error_message.clone().unwrap_or(default);
    ValidationError::new(&descriptor.name, message, value, index)
}
