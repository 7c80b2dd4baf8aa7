//! Parsing transport responses into pages of values.

use inputspec_fields::{ResponseMapping, ValueAlias};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of admissible values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesPage {
    pub values: Vec<ValueAlias>,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl ValuesPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Walk a dotted path (`data.items`) into a JSON document.
fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |node, segment| node.get(segment))
}

fn mapped<'a>(root: &'a Value, field: Option<&String>) -> Option<&'a Value> {
    field.and_then(|path| lookup(root, path))
}

/// Items are either `{value, label}` objects or bare scalars, which label
/// themselves.
fn to_alias(index: usize, item: &Value) -> Result<ValueAlias, String> {
    match item {
        Value::Object(fields) if fields.contains_key("value") => {
            let value = fields.get("value").cloned().unwrap_or(Value::Null);
            let label = match fields.get("label") {
                Some(Value::String(label)) => label.clone(),
                Some(other) if !other.is_null() => other.to_string(),
                _ => render(&value),
            };
            Ok(ValueAlias { value, label })
        }
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            Ok(ValueAlias::new(item.clone(), render(item)))
        }
        other => Err(format!("item {index} is not a value: {other}")),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

/// Extract a page from a response body according to `mapping`. Without a
/// data field the whole body must be the item list; the other mapped fields
/// are read when present.
pub fn parse_page(body: &str, mapping: Option<&ResponseMapping>) -> Result<ValuesPage, String> {
    let root: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {e}"))?;
    let default_mapping = ResponseMapping::default();
    let mapping = mapping.unwrap_or(&default_mapping);

    let items = match &mapping.data_field {
        Some(path) => lookup(&root, path).ok_or_else(|| format!("missing data field '{path}'"))?,
        None => &root,
    };
    let items = items
        .as_array()
        .ok_or_else(|| "item list is not an array".to_string())?;
    let values = items
        .iter()
        .enumerate()
        .map(|(index, item)| to_alias(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValuesPage {
        values,
        has_next: mapped(&root, mapping.has_next_field.as_ref())
            .and_then(Value::as_bool)
            .unwrap_or(false),
        total: mapped(&root, mapping.total_field.as_ref()).and_then(Value::as_u64),
        page: mapped(&root, mapping.page_field.as_ref()).and_then(as_u32),
        page_size: mapped(&root, mapping.page_size_field.as_ref()).and_then(as_u32),
    })
}
