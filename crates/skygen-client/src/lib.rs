//! Event store clients.
//!
//! `TableService` is the seam the generator talks to; `HttpTableService`
//! speaks the store's REST API and `InMemoryTableService` keeps everything in
//! process for tests and dry runs.

pub mod error;
pub mod http;
pub mod memory;
pub mod options;
pub mod service;

pub use error::{ClientError, Result};
pub use http::HttpTableService;
pub use memory::{InMemoryTableService, Request};
pub use options::ClientOptions;
pub use service::{EventChannel, RemoteProperty, Table, TableService};
