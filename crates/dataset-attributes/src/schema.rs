use crate::configuration::{AttributeMap, Configuration};
use serde_json::Value;

/// One declared attribute and its default value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub default: Value,
}

/// The ordered set of attributes a type accepts, with their defaults.
///
/// A schema is static metadata: it is declared once per type (see
/// [`Attributes`]) and used to filter arbitrary input maps into a
/// [`Configuration`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute with a default value.
    ///
    /// Re-declaring a name replaces its default and keeps its position.
    pub fn attribute(mut self, name: &str, default: impl Into<Value>) -> Self {
        let default = default.into();
        match self.fields.iter_mut().find(|field| field.name == name) {
            Some(field) => field.default = default,
            None => self.fields.push(Field {
                name: name.to_string(),
                default,
            }),
        }
        self
    }

    /// Declare an attribute whose default is `null`.
    pub fn optional(self, name: &str) -> Self {
        self.attribute(name, Value::Null)
    }

    /// Declare every attribute of `other` that is not declared yet.
    pub fn include(mut self, other: &Schema) -> Self {
        for field in &other.fields {
            if !self.contains(&field.name) {
                self.fields.push(field.clone());
            }
        }
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name == name)
    }

    pub fn default_of(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.default)
    }

    /// The configuration built from an empty input.
    pub fn defaults(&self) -> Configuration {
        self.initialize(&AttributeMap::new())
    }

    /// Select the declared attributes from `input`.
    ///
    /// Unknown keys are dropped. Declared keys that are missing from `input`,
    /// or present with a `null` value, take the declared default.
    pub fn initialize(&self, input: &AttributeMap) -> Configuration {
        let values = self
            .fields
            .iter()
            .map(|field| {
                let value = match input.get(&field.name) {
                    Some(value) if !value.is_null() => value.clone(),
                    _ => field.default.clone(),
                };
                (field.name.clone(), value)
            })
            .collect();
        Configuration::from_values(values)
    }
}

/// Types that declare the attributes they are configured with.
pub trait Attributes {
    /// The type-level attribute declarations.
    fn schema() -> &'static Schema;

    /// Build this type's configuration out of an arbitrary input map.
    fn configure(input: &AttributeMap) -> Configuration {
        Self::schema().initialize(input)
    }
}
