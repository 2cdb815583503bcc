//! Chunked Pipeline - Load a batch, query it, flush it, repeat
//!
//! Memory stays bounded by the chunk size: at most one batch of rows is in
//! the engine's table at any time, and the table is emptied after each query.
//!
//! Phases: `Created -> SchemaBound -> (Loading <-> QueryAndFlush) -> Drained`.

use crate::config::ChunkSize;
use crate::engine::{Engine, ResultSink};
use crate::error::{Result, SqawkError};
use crate::ingestion::line_source::LineSource;
use crate::ingestion::table_builder::{TableBuilder, TableDefinition};
use crate::ingestion::tokenizer::Row;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Created,
    SchemaBound,
    Loading,
    QueryAndFlush,
    Drained,
}

/// Counters for one pipeline run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub batches: u64,
    pub rows_loaded: u64,
    pub result_rows: u64,
}

pub struct ChunkedPipeline<'a, R, E: ?Sized> {
    source: &'a mut LineSource<R>,
    engine: &'a mut E,
    chunk_size: ChunkSize,
    table: Option<TableDefinition>,
    phase: PipelinePhase,
    source_exhausted: bool,
    report: PipelineReport,
}

impl<'a, R: BufRead, E: Engine + ?Sized> ChunkedPipeline<'a, R, E> {
    pub fn new(source: &'a mut LineSource<R>, engine: &'a mut E, chunk_size: ChunkSize) -> Self {
        Self {
            source,
            engine,
            chunk_size,
            table: None,
            phase: PipelinePhase::Created,
            source_exhausted: false,
            report: PipelineReport::default(),
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    pub fn table(&self) -> Option<&TableDefinition> {
        self.table.as_ref()
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// Infer the schema from the source and create the table. A chunked
    /// table is indexed here; an unbounded one once its rows are loaded.
    pub fn bind(&mut self, builder: &TableBuilder) -> Result<&TableDefinition> {
        if self.phase != PipelinePhase::Created {
            return Err(SqawkError::Config(format!(
                "table already bound (pipeline is {:?})",
                self.phase
            )));
        }

        let table = builder.build_from_source(self.source)?;
        self.engine.create_table(&table)?;
        if matches!(self.chunk_size, ChunkSize::Rows(_)) {
            self.engine.create_index(&table)?;
        }

        self.phase = PipelinePhase::SchemaBound;
        Ok(self.table.insert(table))
    }

    /// Drain the source batch by batch, running `query` (if any) after each
    /// batch has been loaded.
    pub fn run(
        &mut self,
        query: Option<&str>,
        sink: &mut dyn ResultSink,
    ) -> Result<PipelineReport> {
        let table = self.bound_table()?;

        let mut pending = self.source.next_row()?;
        while let Some(first) = pending.take() {
            self.phase = PipelinePhase::Loading;
            self.engine.begin_transaction()?;

            if let Err(e) = self.run_batch(&table, first, query, sink) {
                if let Err(rollback) = self.engine.rollback_transaction() {
                    warn!("Rollback after failed batch also failed: {}", rollback);
                }
                return Err(e);
            }
            self.engine.end_transaction()?;
            self.report.batches += 1;

            if !self.source_exhausted {
                pending = self.source.next_row()?;
            }
        }
        self.source_exhausted = true;

        self.phase = PipelinePhase::Drained;
        info!(
            "Table {}: {} row(s) in {} batch(es)",
            table.name, self.report.rows_loaded, self.report.batches
        );
        Ok(self.report.clone())
    }

    /// Finish a bound pipeline without reading any rows (dry runs). The
    /// deferred index of an unbounded table is still created.
    pub fn skip_load(&mut self) -> Result<()> {
        let table = self.bound_table()?;
        if self.chunk_size == ChunkSize::Unbounded {
            self.engine.create_index(&table)?;
        }
        self.phase = PipelinePhase::Drained;
        Ok(())
    }

    fn bound_table(&self) -> Result<TableDefinition> {
        match (&self.table, self.phase) {
            (Some(table), PipelinePhase::SchemaBound) => Ok(table.clone()),
            _ => Err(SqawkError::Config(format!(
                "pipeline cannot run from {:?}",
                self.phase
            ))),
        }
    }

    fn run_batch(
        &mut self,
        table: &TableDefinition,
        first: Row,
        query: Option<&str>,
        sink: &mut dyn ResultSink,
    ) -> Result<()> {
        self.engine.insert_row(&table.name, &first)?;
        let mut loaded = 1usize;

        while !self.chunk_size.is_full(loaded) {
            match self.source.next_row()? {
                Some(row) => {
                    self.engine.insert_row(&table.name, &row)?;
                    loaded += 1;
                }
                None => {
                    self.source_exhausted = true;
                    break;
                }
            }
        }
        self.report.rows_loaded += loaded as u64;
        debug!(
            "Batch {} loaded {} row(s) into {}",
            self.report.batches + 1,
            loaded,
            table.name
        );

        if self.chunk_size == ChunkSize::Unbounded {
            self.engine.create_index(table)?;
        }

        self.phase = PipelinePhase::QueryAndFlush;
        if let Some(query) = query {
            self.report.result_rows += self.engine.execute_query(query, sink)?;
        }
        if let ChunkSize::Rows(_) = self.chunk_size {
            self.engine.delete_all(&table.name)?;
        }
        Ok(())
    }
}
