use serde::Serialize;

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    /// Upper bound on events produced for a single object.
    pub max_events_per_object: usize,
    /// Upper bound on rule visits for a single object, emitting or not.
    pub max_steps_per_object: u64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_events_per_object: 100_000,
            max_steps_per_object: 10_000_000,
        }
    }
}

/// Parameters of one run against a table.
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub table: String,
    /// Delete and recreate the table when it already exists.
    pub overwrite: bool,
    /// Number of synthetic objects to generate.
    pub iterations: u64,
    pub generate: GenerateOptions,
}

impl RunOptions {
    pub fn new(table: impl Into<String>, iterations: u64) -> Self {
        Self {
            table: table.into(),
            overwrite: false,
            iterations,
            generate: GenerateOptions::default(),
        }
    }
}

/// Outcome of a schema synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// True when the script declares no schema.
    pub skipped: bool,
    /// Properties added to the remote table.
    pub added: Vec<String>,
    /// Declared properties already present remotely.
    pub existing: Vec<String>,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub seed: u64,
    pub table: String,
    /// True when the table was deleted and recreated.
    pub recreated: bool,
    pub sync: SyncReport,
    pub objects: u64,
    pub events: u64,
    pub duration_ms: u64,
}
