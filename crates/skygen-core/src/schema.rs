use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// Declared set of event properties for a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Schema {
    /// Property definitions in declaration order.
    pub properties: Vec<PropertyDefinition>,
}

/// A named, typed event property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Transient properties apply to a single event instead of the object state.
    #[serde(default)]
    pub transient: bool,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            transient: false,
        }
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }
}

impl Schema {
    pub fn new(properties: Vec<PropertyDefinition>) -> Self {
        Self { properties }
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|property| property.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
