//! SQLite engine backed by rusqlite
//!
//! Every column is bound as text; SQLite's column affinity turns NUMERIC
//! values into numbers on insert.

use crate::engine::{sql, Engine, ResultSink};
use crate::error::{Result, SqawkError};
use crate::ingestion::TableDefinition;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info};

/// Where the database lives
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseLocation {
    Memory,
    Disk(PathBuf),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Print each generated statement before running it
    pub show_sql: bool,

    /// Generate (and optionally print) statements without running them
    pub dry_run: bool,

    /// Enforce FOREIGN KEY constraints
    pub foreign_keys: bool,
}

pub struct SqliteEngine {
    conn: Connection,
    options: EngineOptions,
    /// Table name -> (column count, INSERT statement)
    inserts: HashMap<String, (usize, String)>,
    echo: Box<dyn Write>,
}

impl SqliteEngine {
    /// Open the database; generated SQL, if shown, goes to stdout.
    pub fn open(location: &DatabaseLocation, options: EngineOptions) -> Result<Self> {
        Self::open_with_echo(location, options, Box::new(io::stdout()))
    }

    pub fn open_with_echo(
        location: &DatabaseLocation,
        options: EngineOptions,
        echo: Box<dyn Write>,
    ) -> Result<Self> {
        let conn = match location {
            DatabaseLocation::Memory => Connection::open_in_memory()?,
            DatabaseLocation::Disk(path) => {
                info!("Opening on-disk database {}", path.display());
                Connection::open(path)?
            }
        };

        conn.pragma_update(None, "synchronous", "OFF")?;
        let journal: String =
            conn.pragma_update_and_check(None, "journal_mode", "MEMORY", |row| row.get(0))?;
        debug!("journal_mode = {}", journal);
        if options.foreign_keys {
            conn.pragma_update(None, "foreign_keys", "ON")?;
        }

        Ok(Self {
            conn,
            options,
            inserts: HashMap::new(),
            echo,
        })
    }

    /// In-memory database with default options and no SQL echo.
    pub fn in_memory() -> Result<Self> {
        Self::open_with_echo(
            &DatabaseLocation::Memory,
            EngineOptions::default(),
            Box::new(io::sink()),
        )
    }

    /// The underlying connection, e.g. for inspecting tables in tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn show(&mut self, label: &str, statement: &str) -> Result<()> {
        debug!("{}: {}", label, statement);
        if self.options.show_sql {
            writeln!(self.echo, "-- {}:\n{}", label, statement)?;
            self.echo.flush()?;
        }
        Ok(())
    }

    fn run(&mut self, label: &str, statement: &str) -> Result<()> {
        self.show(label, statement)?;
        if self.options.dry_run {
            return Ok(());
        }
        self.conn.execute_batch(statement)?;
        Ok(())
    }
}

impl Engine for SqliteEngine {
    fn create_table(&mut self, table: &TableDefinition) -> Result<()> {
        self.run("Create table", &sql::create_table(table))?;

        let insert = sql::insert(&table.name, table.schema.len());
        self.show("Insert data ('?': placeholders)", &insert)?;
        self.inserts
            .insert(table.name.clone(), (table.schema.len(), insert));
        Ok(())
    }

    fn create_index(&mut self, table: &TableDefinition) -> Result<()> {
        match &table.index_columns {
            Some(columns) => self.run("Create index", &sql::create_index(&table.name, columns)),
            None => Ok(()),
        }
    }

    fn begin_transaction(&mut self) -> Result<()> {
        if self.options.dry_run {
            return Ok(());
        }
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<()> {
        if self.options.dry_run {
            return Ok(());
        }
        self.conn.execute_batch("END TRANSACTION")?;
        Ok(())
    }

    fn rollback_transaction(&mut self) -> Result<()> {
        if self.options.dry_run || self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn insert_row(&mut self, table: &str, row: &[String]) -> Result<()> {
        let (column_count, insert) = self
            .inserts
            .get(table)
            .ok_or_else(|| SqawkError::Engine(format!("no such table: {}", table)))?;

        if row.len() != *column_count {
            return Err(SqawkError::Engine(format!(
                "table {} has {} columns but {} values were supplied",
                table,
                column_count,
                row.len()
            )));
        }
        if self.options.dry_run {
            return Ok(());
        }

        let mut stmt = self.conn.prepare_cached(insert)?;
        stmt.execute(params_from_iter(row.iter()))?;
        Ok(())
    }

    fn delete_all(&mut self, table: &str) -> Result<()> {
        let statement = sql::delete_all(table);
        if self.options.dry_run {
            return Ok(());
        }
        debug!("Flush: {}", statement);
        self.conn.execute(&statement, [])?;
        Ok(())
    }

    fn execute_query(&mut self, query: &str, sink: &mut dyn ResultSink) -> Result<u64> {
        if self.options.dry_run {
            return Ok(0);
        }

        let mut stmt = self.conn.prepare(query)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = names.len();

        let mut rows = stmt.query([])?;
        let mut count = 0u64;
        while let Some(row) = rows.next()? {
            if count == 0 {
                sink.header(&names)?;
            }
            let values = (0..column_count)
                .map(|i| row.get_ref(i).map(render_value))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            sink.row(&values)?;
            count += 1;
        }

        Ok(count)
    }
}

/// Text form of a result cell. NULL is the empty string.
pub fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => format_real(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// A real in the form SQLite itself converts it to text (`%!.15g`): 15
/// significant digits, always a digit after the point, and exponent form
/// below 1e-4 or from 1e15 up.
pub fn format_real(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-Inf" } else { "Inf" }.to_string();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let scientific = format!("{:.14e}", value.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = match digits.trim_end_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };

    if !(-4..15).contains(&exponent) {
        let (first, rest) = digits.split_at(1);
        let rest = if rest.is_empty() { "0" } else { rest };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        format!("{}{}.{}e{}{:02}", sign, first, rest, exp_sign, exponent.abs())
    } else if exponent >= 0 {
        let int_len = exponent as usize + 1;
        if digits.len() <= int_len {
            let padding = "0".repeat(int_len - digits.len());
            format!("{}{}{}.0", sign, digits, padding)
        } else {
            let (int, frac) = digits.split_at(int_len);
            format!("{}{}.{}", sign, int, frac)
        }
    } else {
        let zeros = "0".repeat((-exponent - 1) as usize);
        format!("{}0.{}{}", sign, zeros, digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::schema_inference::{ColumnSchema, ColumnType, InferredColumn};
    use crate::output::CollectedResults;

    fn primates() -> TableDefinition {
        TableDefinition {
            name: "primates".into(),
            schema: ColumnSchema {
                columns: vec![
                    InferredColumn { name: "Genus".into(), data_type: ColumnType::Text },
                    InferredColumn { name: "nb_species".into(), data_type: ColumnType::Numeric },
                ],
                literal_names: false,
            },
            primary_key: Vec::new(),
            foreign_key: None,
            index_columns: Some("Genus".into()),
        }
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_insert_and_query() {
        let mut engine = SqliteEngine::in_memory().unwrap();
        engine.create_table(&primates()).unwrap();
        engine.create_index(&primates()).unwrap();
        engine.insert_row("primates", &row(&["Pan", "2"])).unwrap();
        engine.insert_row("primates", &row(&["Colobus", "5"])).unwrap();

        let mut results = CollectedResults::default();
        let n = engine
            .execute_query(
                "SELECT Genus, nb_species * 2 AS twice FROM primates ORDER BY Genus",
                &mut results,
            )
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(results.headers, vec![row(&["Genus", "twice"])]);
        assert_eq!(results.rows, vec![row(&["Colobus", "10"]), row(&["Pan", "4"])]);
    }

    #[test]
    fn test_no_rows_no_header() {
        let mut engine = SqliteEngine::in_memory().unwrap();
        engine.create_table(&primates()).unwrap();
        let mut results = CollectedResults::default();
        assert_eq!(engine.execute_query("SELECT * FROM primates", &mut results).unwrap(), 0);
        assert!(results.headers.is_empty());
    }

    #[test]
    fn test_row_length_checked() {
        let mut engine = SqliteEngine::in_memory().unwrap();
        engine.create_table(&primates()).unwrap();
        let err = engine.insert_row("primates", &row(&["Pan"])).unwrap_err();
        assert!(matches!(err, SqawkError::Engine(_)));
    }

    #[test]
    fn test_engine_message_surfaced() {
        let mut engine = SqliteEngine::in_memory().unwrap();
        let mut results = CollectedResults::default();
        match engine.execute_query("SELECT * FROM missing", &mut results) {
            Err(SqawkError::Engine(msg)) => assert!(msg.contains("missing")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_delete_all() {
        let mut engine = SqliteEngine::in_memory().unwrap();
        engine.create_table(&primates()).unwrap();
        engine.begin_transaction().unwrap();
        engine.insert_row("primates", &row(&["Pan", "2"])).unwrap();
        engine.delete_all("primates").unwrap();
        engine.end_transaction().unwrap();
        let count: i64 = engine
            .connection()
            .query_row("SELECT count(*) FROM primates", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_dry_run_executes_nothing() {
        let options = EngineOptions { dry_run: true, ..Default::default() };
        let mut engine =
            SqliteEngine::open_with_echo(&DatabaseLocation::Memory, options, Box::new(io::sink()))
                .unwrap();
        engine.create_table(&primates()).unwrap();
        engine.insert_row("primates", &row(&["Pan", "2"])).unwrap();
        let exists: i64 = engine
            .connection()
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE name = 'primates'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(exists, 0);
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(ValueRef::Null), "");
        assert_eq!(render_value(ValueRef::Integer(26)), "26");
        assert_eq!(render_value(ValueRef::Real(2.5)), "2.5");
        assert_eq!(render_value(ValueRef::Real(26.0)), "26.0");
        assert_eq!(render_value(ValueRef::Text(b"Pan")), "Pan");
    }

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(0.1 + 0.2), "0.3");
        assert_eq!(format_real(1e20), "1.0e+20");
        assert_eq!(format_real(1e15), "1.0e+15");
        assert_eq!(format_real(999999999999999.0), "999999999999999.0");
        assert_eq!(format_real(123456789012345678.0), "1.23456789012346e+17");
        assert_eq!(format_real(0.0001), "0.0001");
        assert_eq!(format_real(0.00001), "1.0e-05");
        assert_eq!(format_real(1.0 / 3.0), "0.333333333333333");
        assert_eq!(format_real(-2.5), "-2.5");
        assert_eq!(format_real(0.0), "0.0");
        assert_eq!(format_real(f64::INFINITY), "Inf");
    }

    #[test]
    fn test_reals_match_sqlite_text() {
        let mut engine = SqliteEngine::in_memory().unwrap();
        let mut results = CollectedResults::default();
        engine
            .execute_query(
                "SELECT 0.1 + 0.2, 1e20, 7 / 2.0, \
                 CAST(0.1 + 0.2 AS TEXT), CAST(1e20 AS TEXT), CAST(7 / 2.0 AS TEXT)",
                &mut results,
            )
            .unwrap();
        let values = &results.rows[0];
        assert_eq!(values[..3], values[3..]);
        assert_eq!(values[..3], row(&["0.3", "1.0e+20", "3.5"])[..]);
    }
}
