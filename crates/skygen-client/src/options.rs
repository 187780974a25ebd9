use std::time::Duration;

/// Options that control how the HTTP client reaches the event store.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    /// Per-request timeout; streaming requests only bound the connect phase.
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8585,
            timeout: Duration::from_secs(10),
        }
    }
}
