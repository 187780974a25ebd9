use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use tracing::debug;

use skygen_core::PropertyDefinition;

use crate::error::{ClientError, Result};
use crate::options::ClientOptions;
use crate::service::{EventChannel, RemoteProperty, Table, TableService};

mod stream;
pub mod wire;

pub use stream::HttpEventChannel;

/// Client for the event store's REST API.
#[derive(Debug, Clone)]
pub struct HttpTableService {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTableService {
    /// Create a new client using the provided options.
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let base_url = Url::parse(&options.base_url())
            .map_err(|err| ClientError::InvalidUrl(format!("{}: {err}", options.base_url())))?;
        let client = Client::builder().connect_timeout(options.timeout).build()?;
        Ok(Self {
            client,
            base_url,
            timeout: options.timeout,
        })
    }

    /// Build a URL below the base, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Request bounded by the configured timeout.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url).timeout(self.timeout)
    }
}

#[async_trait]
impl TableService for HttpTableService {
    fn backend(&self) -> &'static str {
        "http"
    }

    fn target(&self) -> String {
        self.base_url.to_string()
    }

    async fn ping(&self) -> bool {
        let url = match self.endpoint(&["ping"]) {
            Ok(url) => url,
            Err(err) => {
                debug!(error = %err, "ping failed");
                return false;
            }
        };
        match self.request(Method::GET, url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(error = %err, "ping failed");
                false
            }
        }
    }

    async fn get_table(&self, name: &str) -> Result<Option<Table>> {
        let response = self
            .request(Method::GET, self.endpoint(&["tables", name])?)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "get table").await?;
        Ok(Some(response.json::<Table>().await?))
    }

    async fn create_table(&self, table: &Table) -> Result<()> {
        let response = self
            .request(Method::POST, self.endpoint(&["tables"])?)
            .json(table)
            .send()
            .await?;
        check_status(response, "create table").await?;
        Ok(())
    }

    async fn delete_table(&self, table: &Table) -> Result<()> {
        let response = self
            .request(Method::DELETE, self.endpoint(&["tables", &table.name])?)
            .send()
            .await?;
        check_status(response, "delete table").await?;
        Ok(())
    }

    async fn properties(&self, table: &Table) -> Result<Vec<RemoteProperty>> {
        let response = self
            .request(
                Method::GET,
                self.endpoint(&["tables", &table.name, "properties"])?,
            )
            .send()
            .await?;
        let response = check_status(response, "list properties").await?;
        Ok(response.json::<Vec<RemoteProperty>>().await?)
    }

    async fn create_property(&self, table: &Table, property: &PropertyDefinition) -> Result<()> {
        let response = self
            .request(
                Method::POST,
                self.endpoint(&["tables", &table.name, "properties"])?,
            )
            .json(&RemoteProperty::from(property))
            .send()
            .await?;
        check_status(response, "create property").await?;
        Ok(())
    }

    async fn open_stream(&self, table: &Table) -> Result<Box<dyn EventChannel>> {
        let url = self.endpoint(&["tables", &table.name, "events"])?;
        Ok(Box::new(HttpEventChannel::open(&self.client, url)))
    }
}

/// Turn a non-success response into `ClientError::Status`.
pub(crate) async fn check_status(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        context: context.to_string(),
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_escaped_as_one_segment() {
        let service = HttpTableService::new(&ClientOptions::default()).unwrap();
        let url = service
            .endpoint(&["tables", "a/b?c#d", "properties"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8585/tables/a%2Fb%3Fc%23d/properties"
        );
        assert_eq!(
            service.endpoint(&["ping"]).unwrap().as_str(),
            "http://localhost:8585/ping"
        );
    }
}
