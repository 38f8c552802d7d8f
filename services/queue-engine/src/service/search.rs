//! Field filters for the list endpoints.
//!
//! A filter is a set of `field=value` pairs taken from the query string.
//! A document matches when every pair matches its serialized JSON form.
//! Dotted keys reach into nested objects, and an array matches when any of
//! its elements does.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    fields: BTreeMap<String, String>,
}

impl DocumentFilter {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn matches<T: Serialize>(&self, document: &T) -> bool {
        if self.fields.is_empty() {
            return true;
        }
        let Ok(value) = serde_json::to_value(document) else {
            return false;
        };
        self.fields.iter().all(|(key, expected)| {
            let path: Vec<&str> = key.split('.').collect();
            path_matches(&value, &path, expected)
        })
    }

    /// Keeps the documents that match.
    pub fn apply<T: Serialize>(&self, documents: Vec<T>) -> Vec<T> {
        if self.fields.is_empty() {
            return documents;
        }
        documents.into_iter().filter(|d| self.matches(d)).collect()
    }
}

impl From<BTreeMap<String, String>> for DocumentFilter {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self::new(fields)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DocumentFilter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn path_matches(value: &Value, path: &[&str], expected: &str) -> bool {
    if let Value::Array(items) = value {
        return items.iter().any(|item| path_matches(item, path, expected));
    }
    match path.split_first() {
        None => scalar_matches(value, expected),
        Some((head, rest)) => match value {
            Value::Object(map) => map
                .get(*head)
                .is_some_and(|child| path_matches(child, rest, expected)),
            _ => false,
        },
    }
}

fn scalar_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}
