use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use skygen_core::{Event, PropertyDefinition};

use crate::error::{ClientError, Result};
use crate::service::{EventChannel, RemoteProperty, Table, TableService};

/// Request observed by the in-memory service, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Ping,
    GetTable(String),
    CreateTable(String),
    DeleteTable(String),
    ListProperties(String),
    CreateProperty { table: String, property: String },
    OpenStream(String),
    Send { table: String, object_id: String },
    CloseStream(String),
}

#[derive(Debug, Default)]
struct MemoryTable {
    properties: Vec<RemoteProperty>,
    events: Vec<Event>,
}

#[derive(Debug)]
struct MemoryState {
    reachable: bool,
    tables: BTreeMap<String, MemoryTable>,
    requests: Vec<Request>,
    fail_sends_after: Option<usize>,
    next_property_id: i64,
}

/// Event store kept entirely in process.
///
/// Clones share state, so a test can hand one clone to the generator and
/// inspect the other.
#[derive(Debug, Clone)]
pub struct InMemoryTableService {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for InMemoryTableService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTableService {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                reachable: true,
                tables: BTreeMap::new(),
                requests: Vec::new(),
                fail_sends_after: None,
                next_property_id: 1,
            })),
        }
    }

    /// Seed a table with existing properties.
    pub fn with_table(self, name: &str, properties: Vec<PropertyDefinition>) -> Self {
        {
            let mut state = self.lock();
            let mut table = MemoryTable::default();
            for property in &properties {
                let id = state.next_property_id;
                state.next_property_id += 1;
                let mut remote = RemoteProperty::from(property);
                remote.id = Some(id);
                table.properties.push(remote);
            }
            state.tables.insert(name.to_string(), table);
        }
        self
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Fail every send once `count` events have been accepted.
    pub fn fail_sends_after(&self, count: usize) {
        self.lock().fail_sends_after = Some(count);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    pub fn events(&self, table: &str) -> Vec<Event> {
        self.lock()
            .tables
            .get(table)
            .map(|table| table.events.clone())
            .unwrap_or_default()
    }

    pub fn table_properties(&self, table: &str) -> Vec<RemoteProperty> {
        self.lock()
            .tables
            .get(table)
            .map(|table| table.properties.clone())
            .unwrap_or_default()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.lock().tables.contains_key(table)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-request; the data is still usable.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn reachable(state: &MemoryState) -> Result<()> {
        if state.reachable {
            Ok(())
        } else {
            Err(ClientError::Unreachable("in-memory store is offline".to_string()))
        }
    }
}

#[async_trait]
impl TableService for InMemoryTableService {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> bool {
        let mut state = self.lock();
        state.requests.push(Request::Ping);
        state.reachable
    }

    async fn get_table(&self, name: &str) -> Result<Option<Table>> {
        let mut state = self.lock();
        state.requests.push(Request::GetTable(name.to_string()));
        Self::reachable(&state)?;
        Ok(state.tables.contains_key(name).then(|| Table::new(name)))
    }

    async fn create_table(&self, table: &Table) -> Result<()> {
        let mut state = self.lock();
        state.requests.push(Request::CreateTable(table.name.clone()));
        Self::reachable(&state)?;
        if state.tables.contains_key(&table.name) {
            return Err(ClientError::Rejected(format!(
                "table '{}' already exists",
                table.name
            )));
        }
        state
            .tables
            .insert(table.name.clone(), MemoryTable::default());
        Ok(())
    }

    async fn delete_table(&self, table: &Table) -> Result<()> {
        let mut state = self.lock();
        state.requests.push(Request::DeleteTable(table.name.clone()));
        Self::reachable(&state)?;
        state
            .tables
            .remove(&table.name)
            .map(|_| ())
            .ok_or_else(|| ClientError::Rejected(format!("table '{}' not found", table.name)))
    }

    async fn properties(&self, table: &Table) -> Result<Vec<RemoteProperty>> {
        let mut state = self.lock();
        state
            .requests
            .push(Request::ListProperties(table.name.clone()));
        Self::reachable(&state)?;
        state
            .tables
            .get(&table.name)
            .map(|table| table.properties.clone())
            .ok_or_else(|| ClientError::Rejected(format!("table '{}' not found", table.name)))
    }

    async fn create_property(&self, table: &Table, property: &PropertyDefinition) -> Result<()> {
        let mut state = self.lock();
        state.requests.push(Request::CreateProperty {
            table: table.name.clone(),
            property: property.name.clone(),
        });
        Self::reachable(&state)?;
        let id = state.next_property_id;
        let Some(remote) = state.tables.get_mut(&table.name) else {
            return Err(ClientError::Rejected(format!(
                "table '{}' not found",
                table.name
            )));
        };
        if remote
            .properties
            .iter()
            .any(|existing| existing.name == property.name)
        {
            return Err(ClientError::Rejected(format!(
                "property '{}' already exists",
                property.name
            )));
        }
        let mut created = RemoteProperty::from(property);
        created.id = Some(id);
        remote.properties.push(created);
        state.next_property_id += 1;
        Ok(())
    }

    async fn open_stream(&self, table: &Table) -> Result<Box<dyn EventChannel>> {
        let mut state = self.lock();
        state.requests.push(Request::OpenStream(table.name.clone()));
        Self::reachable(&state)?;
        if !state.tables.contains_key(&table.name) {
            return Err(ClientError::Rejected(format!(
                "table '{}' not found",
                table.name
            )));
        }
        Ok(Box::new(InMemoryEventChannel {
            service: self.clone(),
            table: table.name.clone(),
            open: true,
        }))
    }
}

struct InMemoryEventChannel {
    service: InMemoryTableService,
    table: String,
    open: bool,
}

#[async_trait]
impl EventChannel for InMemoryEventChannel {
    async fn send(&mut self, event: &Event) -> Result<()> {
        if !self.open {
            return Err(ClientError::ChannelClosed("channel already closed".to_string()));
        }
        let mut state = self.service.lock();
        state.requests.push(Request::Send {
            table: self.table.clone(),
            object_id: event.object_id.clone(),
        });
        InMemoryTableService::reachable(&state)?;
        let limit = state.fail_sends_after;
        let Some(table) = state.tables.get_mut(&self.table) else {
            return Err(ClientError::ChannelClosed(format!(
                "table '{}' disappeared",
                self.table
            )));
        };
        if limit.is_some_and(|limit| table.events.len() >= limit) {
            return Err(ClientError::ChannelClosed("injected send failure".to_string()));
        }
        table.events.push(event.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.service
            .lock()
            .requests
            .push(Request::CloseStream(self.table.clone()));
        Ok(())
    }
}
