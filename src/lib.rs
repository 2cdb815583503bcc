pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod observability;
pub mod output;
pub mod runner;

pub use config::{ChunkSize, RunConfig, SourceConfig};
pub use engine::{Engine, ResultSink, SqliteEngine};
pub use error::{Result, SqawkError};
pub use output::TabularEmitter;
