//! Declarative input field specifications and their validation pipeline
//!
//! `inputspec-fields` describes the shape, constraints, and value domain of an
//! input field and validates candidate values against that description. It is
//! pure and synchronous: no I/O, no async runtime, no shared mutable state.
//!
//! # Architecture
//!
//! - **Model**: [`FieldSpec`], [`ConstraintDescriptor`] and [`ValuesEndpoint`]
//!   map one-to-one onto the JSON wire format
//! - **Registry**: [`ConstraintRegistry`] turns each constraint kind into a
//!   check for the field's data type and multiplicity; hosts plug in
//!   [`CustomConstraint`] evaluators
//! - **Pipeline**: [`FieldValidator`] runs required → type → membership →
//!   constraints and returns a [`ValidationResult`]
//!
//! ```
//! use inputspec_fields::{ConstraintDescriptor, ConstraintType, DataType, FieldSpec, FieldValidator};
//! use serde_json::json;
//!
//! let field = FieldSpec::new("Code", DataType::String)
//!     .required(true)
//!     .with_constraints(vec![ConstraintDescriptor::new(
//!         "syntax",
//!         ConstraintType::Pattern,
//!         json!({"regex": "^[A-Z]+$"}),
//!     )]);
//!
//! let validator = FieldValidator::new();
//! assert!(validator.validate(&field, &json!("ABC")).is_valid);
//! assert!(!validator.validate(&field, &json!("abc")).is_valid);
//! ```

pub mod constraint;
pub mod domain;
pub mod error;
pub mod registry;
pub mod types;
pub mod validation;
pub mod value;

pub use constraint::{ConstraintDescriptor, ConstraintType};
pub use domain::DomainLookup;
pub use error::{FieldsError, Result};
pub use registry::{CompiledConstraint, ConstraintRegistry, CustomConstraint, FieldShape, Scope};
pub use types::{
    CacheStrategy, DataType, DomainMode, FieldResponse, FieldSpec, FieldsResponse, HttpMethod,
    InputSpec, PaginationStrategy, Protocol, RequestParams, ResponseMapping, ValueAlias,
    ValuesEndpoint, CURRENT_PROTOCOL_VERSION,
};
pub use validation::{
    FieldValidator, ValidationError, ValidationOptions, ValidationResult, MEMBERSHIP, REQUIRED,
    TYPE,
};
