use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use skygen_core::{DataType, Event, PropertyDefinition};

use crate::error::Result;

/// Remote table identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Property as reported by the event store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub transient: bool,
    #[serde(rename = "dataType")]
    pub data_type: DataType,
}

impl From<&PropertyDefinition> for RemoteProperty {
    fn from(value: &PropertyDefinition) -> Self {
        Self {
            id: None,
            name: value.name.clone(),
            transient: value.transient,
            data_type: value.data_type,
        }
    }
}

/// Operations the generator needs from an event store.
#[async_trait]
pub trait TableService: Send + Sync {
    /// Returns the backend identifier (e.g. `http`).
    fn backend(&self) -> &'static str;

    /// Human-readable location of the store, used in error messages.
    fn target(&self) -> String {
        self.backend().to_string()
    }

    /// Returns true when the store answers.
    async fn ping(&self) -> bool;

    /// Look up a table by name; `None` when it does not exist.
    async fn get_table(&self, name: &str) -> Result<Option<Table>>;

    async fn create_table(&self, table: &Table) -> Result<()>;

    async fn delete_table(&self, table: &Table) -> Result<()>;

    /// Current property list of a table.
    async fn properties(&self, table: &Table) -> Result<Vec<RemoteProperty>>;

    /// Add one property to a table.
    async fn create_property(&self, table: &Table, property: &PropertyDefinition) -> Result<()>;

    /// Open a long-lived write channel to a table.
    async fn open_stream(&self, table: &Table) -> Result<Box<dyn EventChannel>>;
}

/// Write channel accepting events for durable append.
#[async_trait]
pub trait EventChannel: Send {
    /// Send one event; returns once the transport accepted it.
    async fn send(&mut self, event: &Event) -> Result<()>;

    /// Flush and release the channel. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}
