use crate::error::{AttributeError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// A loose, caller-supplied set of attributes.
pub type AttributeMap = Map<String, Value>;

/// An immutable set of attribute values, keyed exactly by a schema's names.
///
/// Keys iterate in the schema's declaration order.
///
/// Built by [`crate::Schema::initialize`]; there is no way to add or remove a
/// key afterwards. Deriving a new configuration goes through
/// [`Configuration::merge`] and a fresh `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Configuration {
    values: AttributeMap,
}

impl Configuration {
    pub(crate) fn from_values(values: AttributeMap) -> Self {
        Self { values }
    }

    /// The raw value of a declared attribute, `None` if it is not declared.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Whether the attribute is declared and holds a non-null value.
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| !value.is_null())
    }

    /// Deserialize an attribute into `T`; `Ok(None)` when it is null.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.values.get(name) {
            None => Err(AttributeError::Undeclared(name.to_string())),
            Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| AttributeError::InvalidType {
                    name: name.to_string(),
                    expected: std::any::type_name::<T>(),
                    source,
                }),
        }
    }

    /// Like [`Self::get_as`], but a null value is an error.
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.get_as(name)?
            .ok_or_else(|| AttributeError::Missing(name.to_string()))
    }

    /// Read an attribute as a string, rendering numbers and booleans.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(value_to_string)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shallow merge: every key of `overrides` replaces the current value.
    ///
    /// The result is a plain map; feed it back through a schema to get a
    /// configuration again.
    pub fn merge(&self, overrides: &AttributeMap) -> AttributeMap {
        let mut merged = self.values.clone();
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    pub fn to_map(&self) -> AttributeMap {
        self.values.clone()
    }

    /// Names whose values differ between `self` and `other`.
    pub fn changed_keys<'a>(&'a self, other: &'a Configuration) -> Vec<&'a str> {
        let mut changed: Vec<&str> = self
            .values
            .iter()
            .filter(|(key, value)| other.values.get(*key) != Some(*value))
            .map(|(key, _)| key.as_str())
            .collect();
        for key in other.values.keys() {
            if !self.values.contains_key(key) {
                changed.push(key);
            }
        }
        changed
    }
}

/// Render a scalar attribute value as a string; `None` for null.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
