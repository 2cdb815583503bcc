//! Query Engine Interface - What the ingestion pipeline needs from a SQL engine
//!
//! Implementations:
//! - SqliteEngine: rusqlite, in memory or on disk

pub mod sql;
pub mod sqlite;

pub use sqlite::{DatabaseLocation, EngineOptions, SqliteEngine};

use crate::error::Result;
use crate::ingestion::TableDefinition;

/// Receives the rows produced by one query execution
pub trait ResultSink {
    /// Called once, before the first row, with the result column names.
    /// Not called at all when the query yields no rows.
    fn header(&mut self, columns: &[String]) -> Result<()>;

    fn row(&mut self, values: &[String]) -> Result<()>;
}

/// Query Engine Trait
///
/// Every failure is an `SqawkError::Engine` carrying the engine's own message.
pub trait Engine {
    fn create_table(&mut self, table: &TableDefinition) -> Result<()>;

    /// Create the table's index, if it declares one.
    fn create_index(&mut self, table: &TableDefinition) -> Result<()>;

    fn begin_transaction(&mut self) -> Result<()>;

    fn end_transaction(&mut self) -> Result<()>;

    /// Abandon the open transaction, if any.
    fn rollback_transaction(&mut self) -> Result<()>;

    /// Insert one row; its length must match the table's column count.
    fn insert_row(&mut self, table: &str, row: &[String]) -> Result<()>;

    fn delete_all(&mut self, table: &str) -> Result<()>;

    /// Run `sql`, streaming result rows into `sink`. Returns the row count.
    fn execute_query(&mut self, sql: &str, sink: &mut dyn ResultSink) -> Result<u64>;
}
