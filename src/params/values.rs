//! Resolved parameter values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A primitive parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Text or secret content.
    Text(String),
    /// Checkbox state.
    Bool(bool),
}

impl Value {
    /// String content, if textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Bool(_) => None,
        }
    }

    /// Boolean content, if a toggle.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Text(_) => None,
            Value::Bool(b) => Some(*b),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Mapping from parameter name to its resolved value.
///
/// Unset optional values fall back to their spec defaults at the point of
/// use; unset required values fail schema validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolvedValues {
    values: HashMap<String, Value>,
}

impl ResolvedValues {
    /// An empty value set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder form of [`ResolvedValues::insert`] for text.
    pub fn with_str(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), Value::Text(value.into()));
        self
    }

    /// Builder form of [`ResolvedValues::insert`] for booleans.
    pub fn with_bool(mut self, name: impl Into<String>, value: bool) -> Self {
        self.values.insert(name.into(), Value::Bool(value));
        self
    }

    /// Raw value for `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Text value for `name`.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Text value for `name`, skipping empty strings.
    pub fn get_nonempty(&self, name: &str) -> Option<&str> {
        self.get_str(name).filter(|s| !s.is_empty())
    }

    /// Boolean value for `name`, defaulting to `false`.
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }
}
