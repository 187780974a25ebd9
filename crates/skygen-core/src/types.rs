use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Data type of an event property as understood by the event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Integer,
    Float,
    String,
    Boolean,
    Timestamp,
    /// Enumerated set of string labels.
    Factor,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Timestamp => "timestamp",
            DataType::Factor => "factor",
        }
    }

    /// Returns true when a value of type `source` can be stored as `self`.
    pub fn accepts(&self, source: DataType) -> bool {
        matches!(
            (source, *self),
            (DataType::Integer, DataType::Float)
                | (DataType::String, DataType::Factor)
                | (DataType::Factor, DataType::String)
        ) || source == *self
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed value carried by a generated event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Factor(String),
}

impl PropertyValue {
    /// Natural data type of the value, before any coercion.
    pub fn data_type(&self) -> DataType {
        match self {
            PropertyValue::Integer(_) => DataType::Integer,
            PropertyValue::Float(_) => DataType::Float,
            PropertyValue::String(_) => DataType::String,
            PropertyValue::Boolean(_) => DataType::Boolean,
            PropertyValue::Timestamp(_) => DataType::Timestamp,
            PropertyValue::Factor(_) => DataType::Factor,
        }
    }

    /// Coerce the value into `target`.
    ///
    /// Integers widen to floats and strings become factor labels (and back);
    /// every other pairing is a mismatch.
    pub fn coerce(self, target: DataType) -> Result<PropertyValue> {
        let source = self.data_type();
        if !target.accepts(source) {
            return Err(Error::TypeMismatch(format!(
                "cannot use a {source} value as {target}"
            )));
        }
        Ok(match (self, target) {
            (PropertyValue::Integer(value), DataType::Float) => PropertyValue::Float(value as f64),
            (PropertyValue::String(value), DataType::Factor) => PropertyValue::Factor(value),
            (PropertyValue::Factor(value), DataType::String) => PropertyValue::String(value),
            (value, _) => value,
        })
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(value) => Some(*value as f64),
            PropertyValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}
