use skygen_client::{ClientError, EventChannel, Table, TableService};
use skygen_core::Event;

/// Sends generated events over one open channel, in order.
pub struct StreamEmitter {
    channel: Box<dyn EventChannel>,
    emitted: u64,
}

impl StreamEmitter {
    pub async fn open(service: &dyn TableService, table: &Table) -> Result<Self, ClientError> {
        let channel = service.open_stream(table).await?;
        Ok(Self::new(channel))
    }

    pub fn new(channel: Box<dyn EventChannel>) -> Self {
        Self {
            channel,
            emitted: 0,
        }
    }

    /// Send one event; returns once the transport accepted it.
    pub async fn emit(&mut self, event: &Event) -> Result<(), ClientError> {
        self.channel.send(event).await?;
        self.emitted += 1;
        Ok(())
    }

    pub async fn emit_all(&mut self, events: &[Event]) -> Result<(), ClientError> {
        for event in events {
            self.emit(event).await?;
        }
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.channel.close().await
    }

    /// Number of events accepted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}
