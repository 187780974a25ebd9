use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use skygen_client::{Table, TableService};
use skygen_script::Script;

use crate::emitter::StreamEmitter;
use crate::engine::GenerationEngine;
use crate::errors::RunError;
use crate::ids::generate_object_id;
use crate::model::{RunOptions, RunReport, SyncReport};
use crate::random::RandomSource;
use crate::sync::sync_schema;

/// Lifecycle of a run. `Failed` is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Connected,
    TableResolved,
    SchemaSynced,
    Streaming,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Idle => "idle",
            RunState::Connected => "connected",
            RunState::TableResolved => "table_resolved",
            RunState::SchemaSynced => "schema_synced",
            RunState::Streaming => "streaming",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Drives one run: connect, resolve the table, sync the schema, then stream
/// every object's events in order.
pub struct Orchestrator<'a> {
    service: &'a dyn TableService,
    script: &'a Script,
    options: RunOptions,
    state: RunState,
    history: Vec<RunState>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(service: &'a dyn TableService, script: &'a Script, options: RunOptions) -> Self {
        Self {
            service,
            script,
            options,
            state: RunState::Idle,
            history: vec![RunState::Idle],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub async fn run(&mut self, rng: &mut RandomSource) -> Result<RunReport, RunError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!(
            event = "run_started",
            run_id = %run_id,
            seed = rng.seed(),
            table = %self.options.table,
            iterations = self.options.iterations,
            backend = self.service.backend()
        );

        match self.execute(rng).await {
            Ok((recreated, sync, events)) => {
                self.transition(RunState::Done);
                let report = RunReport {
                    run_id,
                    seed: rng.seed(),
                    table: self.options.table.clone(),
                    recreated,
                    sync,
                    objects: self.options.iterations,
                    events,
                    duration_ms: start.elapsed().as_millis() as u64,
                };
                info!(
                    event = "run_finished",
                    run_id = %report.run_id,
                    status = "success",
                    objects = report.objects,
                    events = report.events,
                    duration_ms = report.duration_ms
                );
                Ok(report)
            }
            Err(err) => {
                let failed_in = self.state;
                self.transition(RunState::Failed);
                warn!(
                    event = "run_failed",
                    run_id = %run_id,
                    state = %failed_in,
                    stage = err.stage(),
                    error = %err
                );
                Err(err)
            }
        }
    }

    async fn execute(&mut self, rng: &mut RandomSource) -> Result<(bool, SyncReport, u64), RunError> {
        if !self.service.ping().await {
            return Err(RunError::Connectivity {
                target: self.service.target(),
            });
        }
        self.transition(RunState::Connected);

        let (table, recreated) = self.resolve_table().await?;
        self.transition(RunState::TableResolved);

        let sync = sync_schema(self.service, &table, self.script.schema.as_ref()).await?;
        self.transition(RunState::SchemaSynced);

        let mut emitter = StreamEmitter::open(self.service, &table)
            .await
            .map_err(|source| RunError::Transport {
                context: "open stream".to_string(),
                source,
            })?;
        self.transition(RunState::Streaming);

        let streamed = self.stream(&mut emitter, rng).await;
        let closed = emitter.close().await;
        streamed?;
        closed.map_err(|source| RunError::Transport {
            context: "close stream".to_string(),
            source,
        })?;

        Ok((recreated, sync, emitter.emitted()))
    }

    /// Find or create the target table; with `overwrite` an existing table
    /// is deleted and recreated empty.
    async fn resolve_table(&self) -> Result<(Table, bool), RunError> {
        let name = self.options.table.as_str();
        let table_error = |source| RunError::Table {
            table: name.to_string(),
            source,
        };

        match self.service.get_table(name).await.map_err(table_error)? {
            Some(existing) if self.options.overwrite => {
                self.service
                    .delete_table(&existing)
                    .await
                    .map_err(table_error)?;
                self.service
                    .create_table(&existing)
                    .await
                    .map_err(table_error)?;
                info!(event = "table_recreated", table = %name);
                Ok((existing, true))
            }
            Some(existing) => {
                debug!(table = %name, "using existing table");
                Ok((existing, false))
            }
            None => {
                let table = Table::new(name);
                self.service
                    .create_table(&table)
                    .await
                    .map_err(table_error)?;
                info!(event = "table_created", table = %name);
                Ok((table, false))
            }
        }
    }

    /// Generate and emit each object in turn; the first failure stops the loop.
    async fn stream(
        &self,
        emitter: &mut StreamEmitter,
        rng: &mut RandomSource,
    ) -> Result<(), RunError> {
        let engine = GenerationEngine::new(self.script, self.options.generate.clone());

        for index in 1..=self.options.iterations {
            let object_id = generate_object_id(rng);
            let events = engine
                .generate(&object_id, rng)
                .map_err(|source| RunError::Generation {
                    index,
                    object_id: object_id.clone(),
                    source,
                })?;
            emitter
                .emit_all(&events)
                .await
                .map_err(|source| RunError::Transport {
                    context: format!("object {index} ({object_id})"),
                    source,
                })?;
            info!(
                event = "object_emitted",
                object_index = index,
                object_id = %object_id,
                events = events.len()
            );
        }
        Ok(())
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "run state changed");
        self.state = next;
        self.history.push(next);
    }
}
