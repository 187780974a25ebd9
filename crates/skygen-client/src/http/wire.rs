use std::collections::BTreeMap;

use chrono::SecondsFormat;
use serde::Serialize;

use skygen_core::{Event, PropertyValue};

/// Event encoding accepted by the store's streaming endpoint.
#[derive(Debug, Serialize)]
pub struct WireEvent<'a> {
    pub id: &'a str,
    pub timestamp: String,
    pub data: &'a BTreeMap<String, PropertyValue>,
}

impl<'a> From<&'a Event> for WireEvent<'a> {
    fn from(event: &'a Event) -> Self {
        Self {
            id: &event.object_id,
            timestamp: event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            data: &event.values,
        }
    }
}

/// Encode an event as one newline-terminated JSON line.
pub fn encode_event(event: &Event) -> serde_json::Result<Vec<u8>> {
    let mut line = serde_json::to_vec(&WireEvent::from(event))?;
    line.push(b'\n');
    Ok(line)
}
