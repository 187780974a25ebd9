use thiserror::Error;

use skygen_client::ClientError;
use skygen_core::DataType;

/// Errors emitted while walking a rule tree for one object.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("property '{property}' at {path} is not declared in the schema")]
    UndeclaredProperty { property: String, path: String },
    #[error("invalid parameter at {path}: {message}")]
    InvalidParameter { path: String, message: String },
    #[error("property '{property}' expects {expected} but got {found}")]
    TypeMismatch {
        property: String,
        expected: DataType,
        found: DataType,
    },
    #[error("object exceeded {limit} events")]
    EventLimitExceeded { limit: usize },
    #[error("object exceeded {limit} rule steps at {path}")]
    StepLimitExceeded { limit: u64, path: String },
    #[error("synthetic clock overflowed at {path}")]
    ClockOverflow { path: String },
}

/// Errors emitted while reconciling the declared schema with the remote table.
#[derive(Debug, Error)]
pub enum SchemaSyncError {
    #[error(
        "property '{property}' already exists as {remote} (transient: {remote_transient}) but is declared as {declared} (transient: {declared_transient})"
    )]
    Conflict {
        property: String,
        declared: DataType,
        declared_transient: bool,
        remote: DataType,
        remote_transient: bool,
    },
    #[error("unable to read remote properties: {0}")]
    Fetch(#[source] ClientError),
    #[error("unable to add property '{property}': {source}")]
    Remote {
        property: String,
        #[source]
        source: ClientError,
    },
}

/// Terminal failure of a run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("server is not running: {target}")]
    Connectivity { target: String },
    #[error("unable to resolve table '{table}': {source}")]
    Table {
        table: String,
        #[source]
        source: ClientError,
    },
    #[error("schema error: {0}")]
    SchemaSync(#[from] SchemaSyncError),
    #[error("generation error on object {index} ({object_id}): {source}")]
    Generation {
        index: u64,
        object_id: String,
        #[source]
        source: GenerationError,
    },
    #[error("transport error ({context}): {source}")]
    Transport {
        context: String,
        #[source]
        source: ClientError,
    },
}

impl RunError {
    /// Name of the failing stage.
    pub fn stage(&self) -> &'static str {
        match self {
            RunError::Connectivity { .. } => "connect",
            RunError::Table { .. } => "resolve-table",
            RunError::SchemaSync(_) => "sync-schema",
            RunError::Generation { .. } => "generate",
            RunError::Transport { .. } => "emit",
        }
    }
}
