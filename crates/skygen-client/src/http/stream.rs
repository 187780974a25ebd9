use async_trait::async_trait;
use reqwest::{Body, Client, Response, Url};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use skygen_core::Event;

use crate::error::{ClientError, Result};
use crate::http::check_status;
use crate::http::wire::encode_event;
use crate::service::EventChannel;

/// Events buffered between the generator and the request body.
const CHANNEL_CAPACITY: usize = 64;

type BodyChunk = std::result::Result<Vec<u8>, std::io::Error>;

/// Streaming `PATCH /tables/{name}/events` request fed one JSON line per event.
pub struct HttpEventChannel {
    sender: Option<mpsc::Sender<BodyChunk>>,
    request: Option<JoinHandle<reqwest::Result<Response>>>,
    sent: u64,
}

impl HttpEventChannel {
    pub(crate) fn open(client: &Client, url: Url) -> Self {
        let (sender, receiver) = mpsc::channel::<BodyChunk>(CHANNEL_CAPACITY);
        let body = Body::wrap_stream(ReceiverStream::new(receiver));
        let request = client.patch(url).body(body).send();
        Self {
            sender: Some(sender),
            request: Some(tokio::spawn(request)),
            sent: 0,
        }
    }

    /// Wait for the request to finish and surface its outcome.
    async fn finish(&mut self) -> Result<()> {
        let Some(request) = self.request.take() else {
            return Ok(());
        };
        let response = request
            .await
            .map_err(|err| ClientError::ChannelClosed(err.to_string()))??;
        check_status(response, "stream events").await?;
        Ok(())
    }
}

#[async_trait]
impl EventChannel for HttpEventChannel {
    async fn send(&mut self, event: &Event) -> Result<()> {
        if self
            .request
            .as_ref()
            .is_some_and(|request| request.is_finished())
        {
            // The server ended the request early; report why.
            self.sender = None;
            self.finish().await?;
            return Err(ClientError::ChannelClosed(
                "server finished the stream early".to_string(),
            ));
        }

        let Some(sender) = &self.sender else {
            return Err(ClientError::ChannelClosed("channel already closed".to_string()));
        };
        let line = encode_event(event)?;
        sender
            .send(Ok(line))
            .await
            .map_err(|_| ClientError::ChannelClosed("request body dropped".to_string()))?;
        self.sent += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the sender ends the request body.
        self.sender = None;
        let outcome = self.finish().await;
        debug!(events = self.sent, "event stream closed");
        outcome
    }
}
