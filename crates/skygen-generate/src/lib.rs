//! Seeded event generation for skygen.
//!
//! A run pings the event store, resolves the target table, reconciles the
//! script schema with the table's properties and then streams the events of
//! each synthetic object, one object after another. Every random decision
//! comes from a single `RandomSource`, so a seed reproduces a run exactly.

pub mod distributions;
pub mod emitter;
pub mod engine;
pub mod errors;
pub mod ids;
pub mod model;
pub mod orchestrator;
pub mod random;
pub mod sync;

pub use emitter::StreamEmitter;
pub use engine::GenerationEngine;
pub use errors::{GenerationError, RunError, SchemaSyncError};
pub use ids::generate_object_id;
pub use model::{GenerateOptions, RunOptions, RunReport, SyncReport};
pub use orchestrator::{Orchestrator, RunState};
pub use random::{RandomSource, resolve_seed};
pub use sync::sync_schema;
