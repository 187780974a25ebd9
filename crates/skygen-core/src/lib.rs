//! Core contracts and helpers for skygen.
//!
//! This crate defines the property types, schema model, and validation
//! helpers shared by the script loader, the store clients and the generator.

pub mod error;
pub mod event;
pub mod schema;
pub mod types;
pub mod validation;

pub use error::{Error, Result};
pub use event::Event;
pub use schema::{PropertyDefinition, Schema};
pub use types::{DataType, PropertyValue};
pub use validation::validate_schema;

/// Current contract version for script documents.
pub const SCRIPT_VERSION: &str = "0.1";
