//! Ingestion Module - Delimited text into SQL tables
//!
//! Handles streaming rows from files and pipes into the engine with:
//! - Preamble skipping and header detection
//! - Schema inference from the header and first data line
//! - Automatic table creation
//! - Bounded-memory load/query/flush cycles

pub mod line_source;
pub mod tokenizer;
pub mod schema_inference;
pub mod table_builder;
pub mod orchestrator;

pub use line_source::{LineSource, LineSourceOptions};
pub use tokenizer::{tokenize, Row};
pub use schema_inference::{ColumnRef, ColumnSchema, ColumnType, InferredColumn, SchemaInference};
pub use table_builder::{ForeignKey, TableBuilder, TableDefinition};
pub use orchestrator::{ChunkedPipeline, PipelinePhase, PipelineReport};
