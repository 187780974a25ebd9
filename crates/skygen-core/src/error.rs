use thiserror::Error;

/// Core error type shared across skygen crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// A value does not fit the declared property type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

/// Convenience alias for results returned by skygen crates.
pub type Result<T> = std::result::Result<T, Error>;
