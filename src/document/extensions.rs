use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionValue {
    String(String),
    Number(i64),
}

/// Source-specific fields carried alongside the base document.
///
/// The pipeline never reads these; adapters write them so downstream
/// consumers can recover per-country attributes (`sigla`, `situacao`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions {
    inner: BTreeMap<String, ExtensionValue>,
}

impl Extensions {
    pub fn new() -> Self {
        Extensions {
            inner: BTreeMap::new(),
        }
    }

    pub fn insert_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), ExtensionValue::String(value.into()));
    }

    pub fn insert_number(&mut self, key: impl Into<String>, value: i64) {
        self.inner.insert(key.into(), ExtensionValue::Number(value));
    }

    /// Insert only when a value is present; API payloads are full of nulls.
    pub fn insert_opt_string(&mut self, key: impl Into<String>, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            self.insert_string(key, value);
        }
    }

    // Later keys override earlier ones.
    pub fn merge(&mut self, other: Extensions) {
        for (k, v) in other.inner {
            self.inner.insert(k, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&ExtensionValue> {
        self.inner.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.inner.get(key) {
            Some(ExtensionValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ExtensionValue)> {
        self.inner.iter()
    }
}
