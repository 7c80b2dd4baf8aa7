//! Fetch options, request keys, and the transport-level request.

use inputspec_fields::{HttpMethod, PaginationStrategy, Protocol, ValuesEndpoint};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::config::ResolverConfig;

/// What the caller asks for: a page, a search string, a page size. Absent
/// entries fall back to the domain's and then the resolver's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchValuesOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl FetchValuesOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The search string, empty when absent.
    pub fn search_text(&self) -> &str {
        self.search.as_deref().unwrap_or_default()
    }
}

/// Logical request key shared by debounce and cache.
///
/// Segments are separated by `|`: the domain address, the effective page,
/// search and limit, the HTTP method, and the domain's `searchParams` as a
/// JSON object with sorted top-level keys (empty when there are none). `%` and
/// `|` inside the address and the search are percent-encoded, so every key
/// of one address starts with [`key_prefix`] of that address and of no other.
pub fn request_key(
    endpoint: &ValuesEndpoint,
    uri: &str,
    page: u32,
    search: &str,
    limit: u32,
) -> String {
    let extra = match &endpoint.search_params {
        Some(params) if !params.is_empty() => {
            let mut entries: Vec<(&String, &Value)> = params.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            Value::Object(sorted).to_string()
        }
        _ => String::new(),
    };
    format!(
        "{}|{page}|{}|{limit}|{}|{extra}",
        escape_segment(uri),
        escape_segment(search),
        endpoint.method.as_str(),
    )
}

/// Prefix shared by every key of one domain address.
pub(crate) fn key_prefix(uri: &str) -> String {
    format!("{}|", escape_segment(uri))
}

fn escape_segment(raw: &str) -> String {
    raw.replace('%', "%25").replace('|', "%7C")
}

/// Options with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EffectiveQuery {
    pub page: u32,
    pub limit: u32,
    pub search: String,
}

impl EffectiveQuery {
    pub fn resolve(
        endpoint: &ValuesEndpoint,
        options: &FetchValuesOptions,
        config: &ResolverConfig,
    ) -> Self {
        let limit = options
            .limit
            .or_else(|| endpoint.request_params.as_ref().and_then(|p| p.default_limit))
            .unwrap_or(config.default_limit);
        Self {
            page: options.page.unwrap_or(config.default_page),
            limit,
            search: options.search_text().to_string(),
        }
    }

    pub fn key(&self, endpoint: &ValuesEndpoint, uri: &str) -> String {
        request_key(endpoint, uri, self.page, &self.search, self.limit)
    }

    /// Build the transport request using the domain's parameter names.
    pub fn to_request(
        &self,
        endpoint: &ValuesEndpoint,
        uri: &str,
        config: &ResolverConfig,
    ) -> ValuesRequest {
        let mut params = endpoint.search_params.clone().unwrap_or_default();
        if let Some(names) = &endpoint.request_params {
            if endpoint.pagination() == PaginationStrategy::PageNumber {
                if let Some(page_param) = &names.page_param {
                    params.insert(page_param.clone(), Value::from(self.page));
                }
            }
            if let Some(limit_param) = &names.limit_param {
                params.insert(limit_param.clone(), Value::from(self.limit));
            }
            if let Some(search_param) = &names.search_param {
                if !self.search.is_empty() {
                    params.insert(search_param.clone(), Value::from(self.search.clone()));
                }
            }
        }
        ValuesRequest {
            uri: uri.to_string(),
            protocol: endpoint.effective_protocol(),
            method: endpoint.method,
            params,
            headers: config.headers.clone(),
        }
    }
}

/// One call handed to a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesRequest {
    pub uri: String,
    pub protocol: Protocol,
    pub method: HttpMethod,
    /// Sent as query parameters for GET and as a JSON object body for POST.
    pub params: Map<String, Value>,
    pub headers: HashMap<String, String>,
}

impl ValuesRequest {
    /// Parameters rendered as query-string pairs: strings verbatim, other
    /// values as compact JSON.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(name, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), rendered)
            })
            .collect()
    }
}
