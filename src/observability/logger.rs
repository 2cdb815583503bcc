//! Run Logger
//!
//! Diagnostics go to stderr through `tracing`, so they never mix with query
//! results on stdout. `RUST_LOG` overrides the level picked from `-v`.

use crate::config::RunConfig;
use crate::ingestion::PipelineReport;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "sqawk=debug,info"
    } else {
        "warn"
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Per-table outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLogEntry {
    pub table: String,
    pub source: String,
    pub report: PipelineReport,
}

/// Everything a run did, in load order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLog {
    pub tables: Vec<TableLogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, table: &str, source: &str, report: PipelineReport) {
        self.tables.push(TableLogEntry {
            table: table.to_string(),
            source: source.to_string(),
            report,
        });
    }

    pub fn rows_loaded(&self) -> u64 {
        self.tables.iter().map(|t| t.report.rows_loaded).sum()
    }

    pub fn result_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.report.result_rows).sum()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub fn log_run_config(config: &RunConfig) {
    match serde_json::to_string(config) {
        Ok(json) => info!("Run configuration: {}", json),
        Err(e) => info!("Run configuration not serializable: {}", e),
    }
}

pub fn log_run_summary(log: &RunLog) {
    info!(
        "Loaded {} row(s) into {} table(s), {} result row(s): {}",
        log.rows_loaded(),
        log.tables.len(),
        log.result_rows(),
        log.to_json()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_totals() {
        let mut log = RunLog::new();
        log.record(
            "genera",
            "genera.tsv",
            PipelineReport {
                batches: 1,
                rows_loaded: 5,
                result_rows: 0,
            },
        );
        log.record(
            "stdin",
            "stdin",
            PipelineReport {
                batches: 3,
                rows_loaded: 6,
                result_rows: 4,
            },
        );
        assert_eq!(log.rows_loaded(), 11);
        assert_eq!(log.result_rows(), 4);

        let parsed: RunLog = serde_json::from_str(&log.to_json()).unwrap();
        assert_eq!(parsed, log);
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "warn");
        assert!(default_filter(true).contains("debug"));
    }
}
