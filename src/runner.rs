//! Run driver
//!
//! Sources are ingested one after another. Every source but the last is
//! loaded whole into its own table; the last one is streamed through the
//! chunked pipeline and the query runs after each of its batches.

use crate::config::{ChunkSize, RunConfig, SourceConfig};
use crate::engine::{Engine, ResultSink};
use crate::error::{Result, SqawkError};
use crate::ingestion::{ChunkedPipeline, LineSource};
use crate::observability::RunLog;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use tracing::info;

/// Open a source for reading; `-` is stdin.
pub fn open_input(source: &SourceConfig) -> Result<Box<dyn BufRead>> {
    if source.is_stdin() {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(&source.path)
        .map_err(|e| SqawkError::Io(io::Error::new(e.kind(), format!("{}: {}", source.path, e))))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Run every source of `config` against `engine`.
///
/// Query results go to `sink`; skipped preamble lines (when echoed) go to
/// `skipped`.
pub fn run(
    config: &RunConfig,
    engine: &mut dyn Engine,
    sink: &mut dyn ResultSink,
    skipped: &mut dyn Write,
) -> Result<RunLog> {
    run_with_opener(config, engine, sink, skipped, open_input)
}

/// Like `run`, with a custom way of opening sources.
pub fn run_with_opener<F>(
    config: &RunConfig,
    engine: &mut dyn Engine,
    sink: &mut dyn ResultSink,
    skipped: &mut dyn Write,
    mut open: F,
) -> Result<RunLog>
where
    F: FnMut(&SourceConfig) -> Result<Box<dyn BufRead>>,
{
    if config.sources.is_empty() {
        return Err(SqawkError::Config("no input sources".to_string()));
    }

    let mut log = RunLog::new();
    let last = config.sources.len() - 1;

    for (n, source_config) in config.sources.iter().enumerate() {
        let builder = source_config.table_builder();
        info!(
            "Reading {} into table {}",
            source_config.display_name(),
            builder.name()
        );

        let reader = open(source_config)?;
        let mut source = LineSource::open(reader, &source_config.line_source_options(), skipped)?;
        skipped.flush()?;

        let (chunk_size, query) = if n == last {
            (config.chunk_size, Some(config.query.as_str()))
        } else {
            (ChunkSize::Unbounded, None)
        };

        let mut pipeline = ChunkedPipeline::new(&mut source, &mut *engine, chunk_size);
        pipeline.bind(&builder)?;
        if config.dry_run {
            pipeline.skip_load()?;
            continue;
        }

        let report = pipeline.run(query, sink)?;
        log.record(builder.name(), source_config.display_name(), report);
    }

    Ok(log)
}
