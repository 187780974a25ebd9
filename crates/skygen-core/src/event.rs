use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::PropertyValue;

/// One timestamped event generated for a synthetic object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub object_id: String,
    pub timestamp: DateTime<Utc>,
    /// Property values keyed by name; ordered so encodings are stable.
    pub values: BTreeMap<String, PropertyValue>,
}

impl Event {
    pub fn new(object_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            object_id: object_id.into(),
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn value(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }
}
