//! Core field specification types.
//!
//! All types serialize to/from JSON via serde using the camelCase wire names of
//! the input field protocol. Optional attributes that are absent are omitted on
//! the wire rather than written as `null`. Specs are immutable once built: the
//! `with_*` helpers consume and return `Self`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;

use crate::constraint::ConstraintDescriptor;
use crate::error::{FieldsError, Result};

/// Protocol version written when a document does not declare one.
pub const CURRENT_PROTOCOL_VERSION: &str = "2.0";

/// Element type of a field. Together with `expect_multiple_values` it decides
/// how every constraint and the value domain are interpreted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    String,
    Number,
    Date,
    Boolean,
}

impl DataType {
    /// Lower-case name used in diagnostic messages.
    pub fn label(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Date => "date",
            DataType::Boolean => "boolean",
        }
    }
}

/// One admissible value: a canonical value and its display label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueAlias {
    pub value: Value,
    pub label: String,
}

impl ValueAlias {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Where the values of a domain come from.
///
/// `Inline` is the embedded mode; every other variant is a transport hint for
/// a remote domain and does not enforce anything by itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Inline,
    Https,
    Http,
    Grpc,
}

/// Strictness of a value domain.
///
/// Legacy tokens are accepted on input (`STRICT` → `CLOSED`,
/// `LENIENT` → `SUGGESTIONS`); unknown tokens fall back to `CLOSED`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum DomainMode {
    #[default]
    Closed,
    Suggestions,
}

impl From<String> for DomainMode {
    fn from(token: String) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "SUGGESTIONS" | "LENIENT" => DomainMode::Suggestions,
            _ => DomainMode::Closed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaginationStrategy {
    #[default]
    None,
    PageNumber,
}

/// Client-side cache hint for remote domains.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheStrategy {
    #[default]
    None,
    Session,
    ShortTerm,
    LongTerm,
}

impl CacheStrategy {
    /// Whether resolved pages may be stored at all.
    pub fn is_cached(&self) -> bool {
        !matches!(self, CacheStrategy::None)
    }

    /// Time-to-live of a stored page. `None` means no expiry (or, for
    /// `CacheStrategy::None`, that nothing is stored).
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            CacheStrategy::None | CacheStrategy::Session => None,
            CacheStrategy::ShortTerm => Some(Duration::from_secs(5 * 60)),
            CacheStrategy::LongTerm => Some(Duration::from_secs(60 * 60)),
        }
    }
}

/// Where to find the item list and page metadata in a remote response body.
/// When `data_field` is absent the whole body is the item list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_next_field: Option<String>,
}

impl ResponseMapping {
    pub fn with_data_field(data_field: impl Into<String>) -> Self {
        Self {
            data_field: Some(data_field.into()),
            ..Self::default()
        }
    }
}

/// Names of the request parameters sent to a remote domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<u32>,
}

/// A value domain descriptor: either an embedded list of items or a remote
/// source fetched by the values resolver.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValuesEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(default)]
    pub mode: DomainMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ValueAlias>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_params: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_params_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination_strategy: Option<PaginationStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mapping: Option<ResponseMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_params: Option<RequestParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_strategy: Option<CacheStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_search_length: Option<usize>,
}

impl ValuesEndpoint {
    /// An embedded domain listing its admissible values directly.
    pub fn inline(mode: DomainMode, items: Vec<ValueAlias>) -> Self {
        Self {
            protocol: Some(Protocol::Inline),
            mode,
            items,
            ..Self::default()
        }
    }

    /// A remote domain fetched from `uri` (HTTPS hint, CLOSED, GET).
    pub fn remote(uri: impl Into<String>) -> Self {
        Self {
            protocol: Some(Protocol::Https),
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: DomainMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_search_field(mut self, field: impl Into<String>) -> Self {
        self.search_field = Some(field.into());
        self
    }

    pub fn with_search_params(mut self, params: Map<String, Value>) -> Self {
        self.search_params = Some(params);
        self
    }

    pub fn with_pagination(mut self, strategy: PaginationStrategy) -> Self {
        self.pagination_strategy = Some(strategy);
        self
    }

    pub fn with_response_mapping(mut self, mapping: ResponseMapping) -> Self {
        self.response_mapping = Some(mapping);
        self
    }

    pub fn with_request_params(mut self, params: RequestParams) -> Self {
        self.request_params = Some(params);
        self
    }

    pub fn with_cache_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.cache_strategy = Some(strategy);
        self
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = Some(debounce_ms);
        self
    }

    pub fn with_min_search_length(mut self, len: usize) -> Self {
        self.min_search_length = Some(len);
        self
    }

    /// The declared protocol, or the one implied by the descriptor's shape:
    /// items without a uri mean an embedded domain, anything else is remote.
    pub fn effective_protocol(&self) -> Protocol {
        match self.protocol {
            Some(protocol) => protocol,
            None if self.uri.is_none() && !self.items.is_empty() => Protocol::Inline,
            None => Protocol::Https,
        }
    }

    pub fn is_inline(&self) -> bool {
        self.effective_protocol() == Protocol::Inline
    }

    pub fn is_closed(&self) -> bool {
        self.mode == DomainMode::Closed
    }

    pub fn pagination(&self) -> PaginationStrategy {
        self.pagination_strategy.unwrap_or_default()
    }

    pub fn cache(&self) -> CacheStrategy {
        self.cache_strategy.unwrap_or_default()
    }

    pub fn min_search_len(&self) -> usize {
        self.min_search_length.unwrap_or(0)
    }

    /// Check the structural invariants: an embedded domain needs items, a
    /// remote one needs an address.
    pub fn validate(&self) -> Result<()> {
        if self.is_inline() {
            if self.items.is_empty() {
                return Err(FieldsError::invalid_domain(
                    "inline domain requires a non-empty item list",
                ));
            }
        } else if self.uri.as_deref().map_or(true, |uri| uri.trim().is_empty()) {
            return Err(FieldsError::invalid_domain("remote domain requires a uri"));
        }
        Ok(())
    }
}

/// Specification of one logical input field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub data_type: DataType,
    #[serde(default)]
    pub expect_multiple_values: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_endpoint: Option<ValuesEndpoint>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_hint: Option<String>,
}

impl FieldSpec {
    /// A single-valued, optional field without constraints.
    pub fn new(display_name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            display_name: display_name.into(),
            description: None,
            data_type,
            expect_multiple_values: false,
            required: false,
            values_endpoint: None,
            constraints: Vec::new(),
            format_hint: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.expect_multiple_values = multiple;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_values_endpoint(mut self, endpoint: ValuesEndpoint) -> Self {
        self.values_endpoint = Some(endpoint);
        self
    }

    pub fn with_constraints(mut self, constraints: Vec<ConstraintDescriptor>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_format_hint(mut self, hint: impl Into<String>) -> Self {
        self.format_hint = Some(hint.into());
        self
    }

    /// Look up a constraint by its declared name.
    pub fn constraint(&self, name: &str) -> Option<&ConstraintDescriptor> {
        self.constraints.iter().find(|c| c.name == name)
    }

    /// Check the structural invariants of the spec: unique constraint names
    /// and a well-formed value domain.
    pub fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for constraint in &self.constraints {
            if !seen.insert(constraint.name.as_str()) {
                return Err(FieldsError::DuplicateConstraintName {
                    field: self.display_name.clone(),
                    name: constraint.name.clone(),
                });
            }
        }
        if let Some(endpoint) = &self.values_endpoint {
            endpoint.validate()?;
        }
        Ok(())
    }
}

/// Top-level document: a versioned, ordered list of field specifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InputSpec {
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

fn default_protocol_version() -> String {
    CURRENT_PROTOCOL_VERSION.to_string()
}

impl InputSpec {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            protocol_version: default_protocol_version(),
            fields,
        }
    }

    /// Parse a JSON document and check every field.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: InputSpec = serde_json::from_str(json)?;
        for field in &spec.fields {
            field.check()?;
        }
        Ok(spec)
    }

    /// Find a field by display name.
    pub fn field(&self, display_name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.display_name == display_name)
    }
}

/// Response envelope listing every field of a form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldsResponse {
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Response envelope carrying a single field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldResponse {
    pub field: FieldSpec,
}
