//! Value domain membership.

use serde_json::Value;

use crate::types::{ValueAlias, ValuesEndpoint};
use crate::value::values_equal;

/// Answers whether a candidate element belongs to a value domain.
///
/// Embedded domains answer from their item list. Callers validating against a
/// remote CLOSED domain pass their own lookup, typically backed by values the
/// resolver has already fetched.
pub trait DomainLookup {
    fn admits(&self, value: &Value) -> bool;
}

impl DomainLookup for [ValueAlias] {
    fn admits(&self, value: &Value) -> bool {
        self.iter().any(|alias| values_equal(&alias.value, value))
    }
}

impl DomainLookup for Vec<ValueAlias> {
    fn admits(&self, value: &Value) -> bool {
        self.as_slice().admits(value)
    }
}

impl ValuesEndpoint {
    /// Membership test against the embedded item list.
    pub fn contains(&self, value: &Value) -> bool {
        self.items.admits(value)
    }

    /// Case-insensitive substring search over the label, or the value when
    /// it is a string, of each embedded item. An empty query returns every
    /// item in order.
    pub fn search_items(&self, query: &str) -> Vec<ValueAlias> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.items.clone();
        }
        let hit = |text: &str| text.to_lowercase().contains(&needle);
        self.items
            .iter()
            .filter(|alias| hit(&alias.label) || alias.value.as_str().is_some_and(hit))
            .cloned()
            .collect()
    }

    /// Label of the item whose value equals `value`.
    pub fn label_for(&self, value: &Value) -> Option<&str> {
        self.items
            .iter()
            .find(|alias| values_equal(&alias.value, value))
            .map(|alias| alias.label.as_str())
    }
}
