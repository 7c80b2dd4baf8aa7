//! Constraint registry: maps each constraint kind to the code that evaluates it.
//!
//! Built-in kinds are compiled once per validation into a [`CompiledConstraint`]
//! for the field's shape. A kind that does not apply to the field's data type
//! compiles to a check that always passes; a kind with malformed parameters
//! fails to compile. Unknown kinds and `custom` constraints are dispatched to
//! evaluators registered with [`ConstraintRegistry::register_custom`] and pass
//! when none is registered.

use chrono::{DateTime, Duration, Utc};
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::constraint::{ConstraintDescriptor, ConstraintType};
use crate::error::{FieldsError, Result};
use crate::types::{DataType, FieldSpec};
use crate::value::{as_count, as_number, display, parse_instant, Numeric};

/// Relative tolerance when checking that a value lies on a range step.
const STEP_EPSILON: f64 = 1e-9;

/// Whether a constraint sees the whole list or each element of a
/// multi-valued field. Single-valued fields always evaluate once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Collection,
    PerElement,
}

/// The part of a field spec a constraint's meaning depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldShape {
    pub data_type: DataType,
    pub multiple: bool,
}

impl From<&FieldSpec> for FieldShape {
    fn from(spec: &FieldSpec) -> Self {
        Self {
            data_type: spec.data_type,
            multiple: spec.expect_multiple_values,
        }
    }
}

/// User-supplied evaluator for `custom` or otherwise unknown constraint kinds.
pub trait CustomConstraint: Send + Sync {
    /// Check one value. `Err` carries the default failure message, used when
    /// the descriptor has no `errorMessage` of its own.
    fn evaluate(
        &self,
        descriptor: &ConstraintDescriptor,
        value: &Value,
    ) -> std::result::Result<(), String>;

    fn scope(&self) -> Scope {
        Scope::PerElement
    }
}

impl<F> CustomConstraint for F
where
    F: Fn(&ConstraintDescriptor, &Value) -> std::result::Result<(), String> + Send + Sync,
{
    fn evaluate(
        &self,
        descriptor: &ConstraintDescriptor,
        value: &Value,
    ) -> std::result::Result<(), String> {
        self(descriptor, value)
    }
}

/// A bound together with its display form, so messages echo the declared
/// parameter (`18`, not `18.0`).
#[derive(Debug, Clone)]
struct Bound<T> {
    at: T,
    shown: String,
}

enum Check {
    Pass,
    Pattern(Regex),
    MinItems(usize),
    MaxItems(usize),
    Chars {
        min: Option<usize>,
        max: Option<usize>,
    },
    MinValue(Bound<Numeric>),
    MaxValue(Bound<Numeric>),
    MinDate(Bound<DateTime<Utc>>),
    MaxDate(Bound<DateTime<Utc>>),
    NumberRange {
        min: Bound<Numeric>,
        max: Bound<Numeric>,
        step: Option<Bound<Numeric>>,
    },
    DateRange {
        min: Bound<DateTime<Utc>>,
        max: Bound<DateTime<Utc>>,
        step: Option<Bound<Duration>>,
    },
    Custom(Arc<dyn CustomConstraint>),
}

/// A constraint prepared for one field shape.
pub struct CompiledConstraint {
    check: Check,
    scope: Scope,
}

impl CompiledConstraint {
    fn new(check: Check, scope: Scope) -> Self {
        Self { check, scope }
    }

    fn pass() -> Self {
        Self::new(Check::Pass, Scope::PerElement)
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// True when the constraint does not apply to the field and always passes.
    pub fn is_noop(&self) -> bool {
        matches!(self.check, Check::Pass)
    }

    /// Evaluate against one value (an element, or the whole list for
    /// collection-scoped checks). `Err` carries the default message.
    pub fn test(
        &self,
        descriptor: &ConstraintDescriptor,
        value: &Value,
    ) -> std::result::Result<(), String> {
        match &self.check {
            Check::Pass => Ok(()),
            Check::Pattern(re) => match value.as_str() {
                Some(text) if re.is_match(text) => Ok(()),
                _ => Err("Invalid format".to_string()),
            },
            Check::MinItems(min) => {
                let len = value.as_array().map_or(0, Vec::len);
                if len < *min {
                    Err(format!("Minimum {min} items required"))
                } else {
                    Ok(())
                }
            }
            Check::MaxItems(max) => {
                let len = value.as_array().map_or(0, Vec::len);
                if len > *max {
                    Err(format!("Maximum {max} items allowed"))
                } else {
                    Ok(())
                }
            }
            Check::Chars { min, max } => {
                let len = value.as_str().map_or(0, |s| s.chars().count());
                if let Some(min) = min.filter(|min| len < *min) {
                    return Err(format!("Minimum length is {min} characters"));
                }
                if let Some(max) = max.filter(|max| len > *max) {
                    return Err(format!("Maximum length is {max} characters"));
                }
                Ok(())
            }
            Check::MinValue(min) => match as_number(value) {
                Some(n) if n >= min.at => Ok(()),
                _ => Err(format!("Minimum value is {}", min.shown)),
            },
            Check::MaxValue(max) => match as_number(value) {
                Some(n) if n <= max.at => Ok(()),
                _ => Err(format!("Maximum value is {}", max.shown)),
            },
            Check::MinDate(min) => match value.as_str().and_then(parse_instant) {
                Some(at) if at >= min.at => Ok(()),
                _ => Err(format!("Date must be on or after {}", min.shown)),
            },
            Check::MaxDate(max) => match value.as_str().and_then(parse_instant) {
                Some(at) if at <= max.at => Ok(()),
                _ => Err(format!("Date must be on or before {}", max.shown)),
            },
            Check::NumberRange { min, max, step } => {
                let Some(n) = as_number(value) else {
                    return Err(format!("Value must be between {} and {}", min.shown, max.shown));
                };
                if n < min.at || n > max.at {
                    return Err(format!("Value must be between {} and {}", min.shown, max.shown));
                }
                match step {
                    Some(step) if !on_number_step(n, min.at, step.at) => Err(format!(
                        "Value must be a multiple of {} from {}",
                        step.shown, min.shown
                    )),
                    _ => Ok(()),
                }
            }
            Check::DateRange { min, max, step } => {
                let Some(at) = value.as_str().and_then(parse_instant) else {
                    return Err(format!("Date must be between {} and {}", min.shown, max.shown));
                };
                if at < min.at || at > max.at {
                    return Err(format!("Date must be between {} and {}", min.shown, max.shown));
                }
                match step {
                    Some(step) => {
                        let offset = (at - min.at).num_milliseconds() as f64;
                        let unit = step.at.num_milliseconds() as f64;
                        if on_step(offset, unit) {
                            Ok(())
                        } else {
                            Err(format!(
                                "Date must fall on a {}-day step from {}",
                                step.shown, min.shown
                            ))
                        }
                    }
                    None => Ok(()),
                }
            }
            Check::Custom(evaluator) => evaluator.evaluate(descriptor, value),
        }
    }
}

/// Whether `n` lies an integer number of steps from `min`. Exact when all
/// three are integers.
fn on_number_step(n: Numeric, min: Numeric, step: Numeric) -> bool {
    match (n, min, step) {
        (Numeric::Int(n), Numeric::Int(min), Numeric::Int(step)) => (n - min) % step == 0,
        _ => on_step(n.as_f64() - min.as_f64(), step.as_f64()),
    }
}

fn on_step(offset: f64, step: f64) -> bool {
    let k = offset / step;
    (k - k.round()).abs() <= STEP_EPSILON * k.abs().max(1.0)
}

type Compiler = fn(&ConstraintDescriptor, FieldShape) -> Result<CompiledConstraint>;

/// Lookup table from constraint kind to its evaluator.
pub struct ConstraintRegistry {
    compilers: HashMap<ConstraintType, Compiler>,
    custom: HashMap<String, Arc<dyn CustomConstraint>>,
}

impl Default for ConstraintRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConstraintRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut custom: Vec<&str> = self.custom.keys().map(String::as_str).collect();
        custom.sort_unstable();
        f.debug_struct("ConstraintRegistry")
            .field("built_in", &self.compilers.len())
            .field("custom", &custom)
            .finish()
    }
}

impl ConstraintRegistry {
    /// A registry with every built-in kind and no custom evaluators.
    pub fn new() -> Self {
        let mut compilers: HashMap<ConstraintType, Compiler> = HashMap::new();
        compilers.insert(ConstraintType::Pattern, compile_pattern);
        compilers.insert(ConstraintType::MinLength, compile_min_length);
        compilers.insert(ConstraintType::MaxLength, compile_max_length);
        compilers.insert(ConstraintType::StringLength, compile_string_length);
        compilers.insert(ConstraintType::MinValue, compile_min_value);
        compilers.insert(ConstraintType::MaxValue, compile_max_value);
        compilers.insert(ConstraintType::MinDate, compile_min_date);
        compilers.insert(ConstraintType::MaxDate, compile_max_date);
        compilers.insert(ConstraintType::Range, compile_range);
        Self {
            compilers,
            custom: HashMap::new(),
        }
    }

    /// Register an evaluator for `custom` constraints whose `params.key` is
    /// `key`, and for unknown kinds whose tag is `key`. Replaces any previous
    /// evaluator under the same key.
    pub fn register_custom(
        &mut self,
        key: impl Into<String>,
        evaluator: impl CustomConstraint + 'static,
    ) -> &mut Self {
        let key = key.into();
        debug!(key = %key, "registered custom constraint");
        self.custom.insert(key, Arc::new(evaluator));
        self
    }

    pub fn has_custom(&self, key: &str) -> bool {
        self.custom.contains_key(key)
    }

    /// Whether `kind` has a dedicated evaluator.
    pub fn supports(&self, kind: &ConstraintType) -> bool {
        match kind {
            ConstraintType::Custom => true,
            ConstraintType::Unknown(tag) => self.custom.contains_key(tag),
            other => self.compilers.contains_key(other),
        }
    }

    /// Prepare `descriptor` for a field of the given shape.
    pub fn compile(
        &self,
        descriptor: &ConstraintDescriptor,
        shape: FieldShape,
    ) -> Result<CompiledConstraint> {
        match &descriptor.kind {
            ConstraintType::Custom | ConstraintType::Unknown(_) => {
                let evaluator = descriptor
                    .custom_key()
                    .and_then(|key| self.custom.get(key));
                match evaluator {
                    Some(evaluator) => Ok(CompiledConstraint::new(
                        Check::Custom(Arc::clone(evaluator)),
                        evaluator.scope(),
                    )),
                    None => {
                        debug!(
                            constraint = %descriptor.name,
                            kind = %descriptor.kind,
                            "no evaluator registered, constraint passes"
                        );
                        Ok(CompiledConstraint::pass())
                    }
                }
            }
            kind => match self.compilers.get(kind) {
                Some(compile) => compile(descriptor, shape),
                None => Ok(CompiledConstraint::pass()),
            },
        }
    }
}

fn require<'a>(descriptor: &'a ConstraintDescriptor, key: &str) -> Result<&'a Value> {
    descriptor
        .param(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| FieldsError::invalid_params(&descriptor.name, format!("missing '{key}'")))
}

fn count_param(descriptor: &ConstraintDescriptor, key: &str) -> Result<usize> {
    let raw = require(descriptor, key)?;
    as_count(raw).ok_or_else(|| {
        FieldsError::invalid_params(
            &descriptor.name,
            format!("'{key}' must be a non-negative integer, got {raw}"),
        )
    })
}

fn optional_count(descriptor: &ConstraintDescriptor, key: &str) -> Result<Option<usize>> {
    match descriptor.param(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => count_param(descriptor, key).map(Some),
    }
}

fn number_param(descriptor: &ConstraintDescriptor, key: &str) -> Result<Bound<Numeric>> {
    let raw = require(descriptor, key)?;
    match as_number(raw) {
        Some(at) if at.is_finite() => Ok(Bound {
            at,
            shown: display(raw),
        }),
        _ => Err(FieldsError::invalid_params(
            &descriptor.name,
            format!("'{key}' must be a number, got {raw}"),
        )),
    }
}

fn date_param(descriptor: &ConstraintDescriptor, key: &str) -> Result<Bound<DateTime<Utc>>> {
    let raw = require(descriptor, key)?;
    raw.as_str()
        .and_then(|text| parse_instant(text).map(|at| (at, text)))
        .map(|(at, text)| Bound {
            at,
            shown: text.to_string(),
        })
        .ok_or_else(|| {
            FieldsError::invalid_params(
                &descriptor.name,
                format!("'{key}' must be an ISO-8601 date, got {raw}"),
            )
        })
}

fn positive_step(descriptor: &ConstraintDescriptor) -> Result<Option<Bound<Numeric>>> {
    match descriptor.param("step") {
        None | Some(Value::Null) => Ok(None),
        Some(_) => {
            let step = number_param(descriptor, "step")?;
            if step.at.as_f64() <= 0.0 {
                return Err(FieldsError::invalid_params(
                    &descriptor.name,
                    "'step' must be positive",
                ));
            }
            Ok(Some(step))
        }
    }
}

fn compile_pattern(descriptor: &ConstraintDescriptor, shape: FieldShape) -> Result<CompiledConstraint> {
    if shape.data_type != DataType::String {
        return Ok(CompiledConstraint::pass());
    }
    let source = require(descriptor, "regex")?.as_str().ok_or_else(|| {
        FieldsError::invalid_params(&descriptor.name, "'regex' must be a string")
    })?;

    let flags = descriptor
        .param("flags")
        .and_then(Value::as_str)
        .unwrap_or_default();

    // Anchored so the whole value has to match. Under `x` a newline closes any
    // trailing `#` comment before the group does.
    let anchored = if flags.contains('x') {
        format!("\\A(?:{source}\n)\\z")
    } else {
        format!("\\A(?:{source})\\z")
    };
    let mut builder = RegexBuilder::new(&anchored);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'u' | 'g' => &mut builder,
            other => {
                return Err(FieldsError::invalid_params(
                    &descriptor.name,
                    format!("unsupported regex flag '{other}'"),
                ))
            }
        };
    }
    let regex = builder
        .build()
        .map_err(|e| FieldsError::invalid_params(&descriptor.name, e.to_string()))?;
    Ok(CompiledConstraint::new(Check::Pattern(regex), Scope::PerElement))
}

fn compile_min_length(descriptor: &ConstraintDescriptor, shape: FieldShape) -> Result<CompiledConstraint> {
    if !shape.multiple {
        return Ok(CompiledConstraint::pass());
    }
    let min = count_param(descriptor, "value")?;
    Ok(CompiledConstraint::new(Check::MinItems(min), Scope::Collection))
}

fn compile_max_length(descriptor: &ConstraintDescriptor, shape: FieldShape) -> Result<CompiledConstraint> {
    if !shape.multiple {
        return Ok(CompiledConstraint::pass());
    }
    let max = count_param(descriptor, "value")?;
    Ok(CompiledConstraint::new(Check::MaxItems(max), Scope::Collection))
}

fn compile_string_length(
    descriptor: &ConstraintDescriptor,
    shape: FieldShape,
) -> Result<CompiledConstraint> {
    if shape.data_type != DataType::String {
        return Ok(CompiledConstraint::pass());
    }
    let min = optional_count(descriptor, "min")?;
    let max = optional_count(descriptor, "max")?;
    match (min, max) {
        (None, None) => Err(FieldsError::invalid_params(
            &descriptor.name,
            "expected 'min' and/or 'max'",
        )),
        (Some(min), Some(max)) if min > max => Err(FieldsError::invalid_params(
            &descriptor.name,
            format!("'min' ({min}) exceeds 'max' ({max})"),
        )),
        _ => Ok(CompiledConstraint::new(
            Check::Chars { min, max },
            Scope::PerElement,
        )),
    }
}

fn compile_min_value(descriptor: &ConstraintDescriptor, shape: FieldShape) -> Result<CompiledConstraint> {
    if shape.data_type != DataType::Number {
        return Ok(CompiledConstraint::pass());
    }
    let min = number_param(descriptor, "value")?;
    Ok(CompiledConstraint::new(Check::MinValue(min), Scope::PerElement))
}

fn compile_max_value(descriptor: &ConstraintDescriptor, shape: FieldShape) -> Result<CompiledConstraint> {
    if shape.data_type != DataType::Number {
        return Ok(CompiledConstraint::pass());
    }
    let max = number_param(descriptor, "value")?;
    Ok(CompiledConstraint::new(Check::MaxValue(max), Scope::PerElement))
}

fn compile_min_date(descriptor: &ConstraintDescriptor, shape: FieldShape) -> Result<CompiledConstraint> {
    if shape.data_type != DataType::Date {
        return Ok(CompiledConstraint::pass());
    }
    let min = date_param(descriptor, "iso")?;
    Ok(CompiledConstraint::new(Check::MinDate(min), Scope::PerElement))
}

fn compile_max_date(descriptor: &ConstraintDescriptor, shape: FieldShape) -> Result<CompiledConstraint> {
    if shape.data_type != DataType::Date {
        return Ok(CompiledConstraint::pass());
    }
    let max = date_param(descriptor, "iso")?;
    Ok(CompiledConstraint::new(Check::MaxDate(max), Scope::PerElement))
}

fn compile_range(descriptor: &ConstraintDescriptor, shape: FieldShape) -> Result<CompiledConstraint> {
    match shape.data_type {
        DataType::Number => {
            let min = number_param(descriptor, "min")?;
            let max = number_param(descriptor, "max")?;
            if min.at > max.at {
                return Err(FieldsError::invalid_params(
                    &descriptor.name,
                    format!("'min' ({}) exceeds 'max' ({})", min.shown, max.shown),
                ));
            }
            let step = positive_step(descriptor)?;
            Ok(CompiledConstraint::new(
                Check::NumberRange { min, max, step },
                Scope::PerElement,
            ))
        }
        DataType::Date => {
            let min = date_param(descriptor, "min")?;
            let max = date_param(descriptor, "max")?;
            if min.at > max.at {
                return Err(FieldsError::invalid_params(
                    &descriptor.name,
                    format!("'min' ({}) is after 'max' ({})", min.shown, max.shown),
                ));
            }
            // Date steps are expressed in days.
            let step = match positive_step(descriptor)? {
                Some(days) => {
                    let millis = (days.at.as_f64() * 86_400_000.0).round() as i64;
                    let at = Duration::try_milliseconds(millis).ok_or_else(|| {
                        FieldsError::invalid_params(&descriptor.name, "'step' is out of range")
                    })?;
                    Some(Bound {
                        at,
                        shown: days.shown,
                    })
                }
                None => None,
            };
            Ok(CompiledConstraint::new(
                Check::DateRange { min, max, step },
                Scope::PerElement,
            ))
        }
        DataType::String | DataType::Boolean => Ok(CompiledConstraint::pass()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape(data_type: DataType, multiple: bool) -> FieldShape {
        FieldShape {
            data_type,
            multiple,
        }
    }

    fn compile(kind: ConstraintType, params: Value, shape: FieldShape) -> Result<CompiledConstraint> {
        let descriptor = ConstraintDescriptor::new("c", kind, params);
        ConstraintRegistry::new().compile(&descriptor, shape)
    }

    fn run(kind: ConstraintType, params: Value, shape: FieldShape, value: Value) -> std::result::Result<(), String> {
        let descriptor = ConstraintDescriptor::new("c", kind, params);
        ConstraintRegistry::new()
            .compile(&descriptor, shape)
            .unwrap()
            .test(&descriptor, &value)
    }

    #[test]
    fn test_pattern_is_anchored() {
        let s = shape(DataType::String, false);
        let params = json!({"regex": "[a-z]+"});
        assert!(run(ConstraintType::Pattern, params.clone(), s, json!("abc")).is_ok());
        assert_eq!(
            run(ConstraintType::Pattern, params, s, json!("abc1")).unwrap_err(),
            "Invalid format"
        );
    }

    #[test]
    fn test_pattern_alternation_is_anchored_as_a_whole() {
        let s = shape(DataType::String, false);
        let params = json!({"regex": "cat|dog"});
        assert!(run(ConstraintType::Pattern, params.clone(), s, json!("dog")).is_ok());
        assert!(run(ConstraintType::Pattern, params, s, json!("dogs")).is_err());
    }

    #[test]
    fn test_pattern_flags() {
        let s = shape(DataType::String, false);
        let params = json!({"regex": "[a-z]+", "flags": "i"});
        assert!(run(ConstraintType::Pattern, params, s, json!("ABC")).is_ok());
        let bad = compile(
            ConstraintType::Pattern,
            json!({"regex": "a", "flags": "q"}),
            s,
        );
        assert!(matches!(bad, Err(FieldsError::InvalidParams { .. })));
    }

    #[test]
    fn test_pattern_verbose_flag_allows_trailing_comment() {
        let s = shape(DataType::String, false);
        let params = json!({"regex": "[a-z]+ # lowercase", "flags": "x"});
        assert!(run(ConstraintType::Pattern, params.clone(), s, json!("abc")).is_ok());
        assert!(run(ConstraintType::Pattern, params, s, json!("ab1")).is_err());
    }

    #[test]
    fn test_pattern_without_verbose_flag_keeps_newline_out_of_match() {
        let s = shape(DataType::String, false);
        let params = json!({"regex": "[a-z]+"});
        assert!(run(ConstraintType::Pattern, params.clone(), s, json!("abc")).is_ok());
        assert!(run(ConstraintType::Pattern, params, s, json!("abc\n")).is_err());
    }

    #[test]
    fn test_pattern_rejects_bad_params() {
        let s = shape(DataType::String, false);
        assert!(compile(ConstraintType::Pattern, json!({}), s).is_err());
        assert!(compile(ConstraintType::Pattern, json!({"regex": 5}), s).is_err());
        assert!(compile(ConstraintType::Pattern, json!({"regex": "("}), s).is_err());
    }

    #[test]
    fn test_pattern_on_numbers_is_inert() {
        let compiled = compile(
            ConstraintType::Pattern,
            json!({"regex": "\\d+"}),
            shape(DataType::Number, false),
        )
        .unwrap();
        assert!(compiled.is_noop());
    }

    #[test]
    fn test_length_bounds_only_apply_to_lists() {
        let single = compile(
            ConstraintType::MinLength,
            json!({"value": 3}),
            shape(DataType::String, false),
        )
        .unwrap();
        assert!(single.is_noop());

        let list = compile(
            ConstraintType::MinLength,
            json!({"value": 2}),
            shape(DataType::String, true),
        )
        .unwrap();
        assert_eq!(list.scope(), Scope::Collection);
        let descriptor = ConstraintDescriptor::new("c", ConstraintType::MinLength, json!({"value": 2}));
        assert_eq!(
            list.test(&descriptor, &json!(["a"])).unwrap_err(),
            "Minimum 2 items required"
        );
        assert!(list.test(&descriptor, &json!(["a", "b"])).is_ok());
    }

    #[test]
    fn test_max_length_message() {
        let s = shape(DataType::String, true);
        assert_eq!(
            run(ConstraintType::MaxLength, json!({"value": 1}), s, json!(["a", "b"])).unwrap_err(),
            "Maximum 1 items allowed"
        );
    }

    #[test]
    fn test_string_length_counts_characters() {
        let s = shape(DataType::String, false);
        let params = json!({"min": 2, "max": 3});
        assert!(run(ConstraintType::StringLength, params.clone(), s, json!("héé")).is_ok());
        assert_eq!(
            run(ConstraintType::StringLength, params.clone(), s, json!("h")).unwrap_err(),
            "Minimum length is 2 characters"
        );
        assert_eq!(
            run(ConstraintType::StringLength, params, s, json!("hello")).unwrap_err(),
            "Maximum length is 3 characters"
        );
        assert!(compile(ConstraintType::StringLength, json!({}), s).is_err());
        assert!(compile(ConstraintType::StringLength, json!({"min": 4, "max": 1}), s).is_err());
    }

    #[test]
    fn test_value_bounds() {
        let s = shape(DataType::Number, false);
        assert!(run(ConstraintType::MinValue, json!({"value": 18}), s, json!(18)).is_ok());
        assert_eq!(
            run(ConstraintType::MinValue, json!({"value": 18}), s, json!(17.5)).unwrap_err(),
            "Minimum value is 18"
        );
        assert_eq!(
            run(ConstraintType::MaxValue, json!({"value": 1.5}), s, json!(2)).unwrap_err(),
            "Maximum value is 1.5"
        );
        assert!(compile(ConstraintType::MinValue, json!({"value": "x"}), s).is_err());
    }

    #[test]
    fn test_value_bounds_are_exact_beyond_f64_precision() {
        let s = shape(DataType::Number, false);
        let min = json!({"value": 9007199254740993_i64});
        assert_eq!(
            run(ConstraintType::MinValue, min.clone(), s, json!(9007199254740992_i64)).unwrap_err(),
            "Minimum value is 9007199254740993"
        );
        assert!(run(ConstraintType::MinValue, min, s, json!(9007199254740993_i64)).is_ok());
        let max = json!({"value": 9007199254740992_i64});
        assert!(run(ConstraintType::MaxValue, max, s, json!(9007199254740993_i64)).is_err());
    }

    #[test]
    fn test_integer_range_step_is_exact() {
        let s = shape(DataType::Number, false);
        let params = json!({"min": 0, "max": 9007199254740995_i64, "step": 2});
        assert!(run(ConstraintType::Range, params.clone(), s, json!(9007199254740994_i64)).is_ok());
        assert!(run(ConstraintType::Range, params, s, json!(9007199254740993_i64)).is_err());
    }

    #[test]
    fn test_date_bounds() {
        let s = shape(DataType::Date, false);
        let params = json!({"iso": "2024-01-01"});
        assert!(run(ConstraintType::MinDate, params.clone(), s, json!("2024-01-01")).is_ok());
        assert!(run(ConstraintType::MinDate, params.clone(), s, json!("2024-06-30T12:00:00Z")).is_ok());
        assert_eq!(
            run(ConstraintType::MinDate, params.clone(), s, json!("2023-12-31")).unwrap_err(),
            "Date must be on or after 2024-01-01"
        );
        assert!(run(ConstraintType::MaxDate, params, s, json!("2024-01-02")).is_err());
        assert!(compile(ConstraintType::MinDate, json!({"iso": "soon"}), s).is_err());
    }

    #[test]
    fn test_number_range_with_step() {
        let s = shape(DataType::Number, false);
        let params = json!({"min": 0, "max": 1, "step": 0.1});
        assert!(run(ConstraintType::Range, params.clone(), s, json!(0.3)).is_ok());
        assert!(run(ConstraintType::Range, params.clone(), s, json!(1)).is_ok());
        assert_eq!(
            run(ConstraintType::Range, params.clone(), s, json!(0.35)).unwrap_err(),
            "Value must be a multiple of 0.1 from 0"
        );
        assert_eq!(
            run(ConstraintType::Range, params, s, json!(1.1)).unwrap_err(),
            "Value must be between 0 and 1"
        );
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let s = shape(DataType::Number, false);
        assert!(compile(ConstraintType::Range, json!({"min": 5, "max": 1}), s).is_err());
        assert!(compile(ConstraintType::Range, json!({"min": 0, "max": 1, "step": 0}), s).is_err());
        assert!(compile(ConstraintType::Range, json!({"max": 1}), s).is_err());
    }

    #[test]
    fn test_date_range_with_day_step() {
        let s = shape(DataType::Date, false);
        let params = json!({"min": "2024-01-01", "max": "2024-01-31", "step": 7});
        assert!(run(ConstraintType::Range, params.clone(), s, json!("2024-01-15")).is_ok());
        assert!(run(ConstraintType::Range, params.clone(), s, json!("2024-01-16")).is_err());
        assert!(run(ConstraintType::Range, params, s, json!("2024-02-05")).is_err());
    }

    #[test]
    fn test_date_range_rejects_out_of_range_step() {
        let s = shape(DataType::Date, false);
        let params = json!({"min": "2024-01-01", "max": "2024-01-31", "step": 1e300});
        assert!(matches!(
            compile(ConstraintType::Range, params, s),
            Err(FieldsError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_range_on_strings_is_inert() {
        let compiled = compile(
            ConstraintType::Range,
            json!({"min": 0, "max": 1}),
            shape(DataType::String, false),
        )
        .unwrap();
        assert!(compiled.is_noop());
    }

    #[test]
    fn test_unknown_and_unregistered_custom_pass() {
        let s = shape(DataType::String, false);
        assert!(compile(ConstraintType::Unknown("luhn".into()), json!({}), s)
            .unwrap()
            .is_noop());
        assert!(compile(ConstraintType::Custom, json!({"key": "nope"}), s)
            .unwrap()
            .is_noop());
    }

    #[test]
    fn test_custom_evaluator_dispatch() {
        let mut registry = ConstraintRegistry::new();
        registry.register_custom("even", |_: &ConstraintDescriptor, v: &Value| {
            match v.as_i64() {
                Some(n) if n % 2 == 0 => Ok(()),
                _ => Err("Must be even".to_string()),
            }
        });
        assert!(registry.has_custom("even"));
        assert!(registry.supports(&ConstraintType::Unknown("even".into())));
        assert!(!registry.supports(&ConstraintType::Unknown("odd".into())));

        let s = shape(DataType::Number, false);
        let by_key = ConstraintDescriptor::new("parity", ConstraintType::Custom, json!({"key": "even"}));
        let compiled = registry.compile(&by_key, s).unwrap();
        assert!(compiled.test(&by_key, &json!(4)).is_ok());
        assert_eq!(compiled.test(&by_key, &json!(3)).unwrap_err(), "Must be even");

        let by_tag = ConstraintDescriptor::new("parity", ConstraintType::Unknown("even".into()), json!({}));
        let compiled = registry.compile(&by_tag, s).unwrap();
        assert!(compiled.test(&by_tag, &json!(5)).is_err());
    }

    #[test]
    fn test_registry_debug_lists_custom_keys() {
        let mut registry = ConstraintRegistry::new();
        let accept = |_: &ConstraintDescriptor, _: &Value| -> std::result::Result<(), String> { Ok(()) };
        registry.register_custom("b", accept);
        registry.register_custom("a", accept);
        let debug = format!("{registry:?}");
        assert!(debug.contains("[\"a\", \"b\"]"));
    }
}
