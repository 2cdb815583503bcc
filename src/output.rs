//! Result output - Tab-separated rendering of query results

use crate::engine::ResultSink;
use crate::error::Result;
use itertools::Itertools;
use std::io::{BufWriter, Write};

/// Writes each result set as a header line followed by one line per row,
/// fields separated by TAB. Values are written as-is, never quoted.
pub struct TabularEmitter<W: Write> {
    out: BufWriter<W>,
}

impl<W: Write> TabularEmitter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.out
            .into_inner()
            .map_err(|e| crate::error::SqawkError::Io(e.into_error()))
    }

    fn write_line(&mut self, fields: &[String]) -> Result<()> {
        writeln!(self.out, "{}", fields.iter().join("\t"))?;
        Ok(())
    }
}

impl<W: Write> ResultSink for TabularEmitter<W> {
    fn header(&mut self, columns: &[String]) -> Result<()> {
        self.write_line(columns)
    }

    fn row(&mut self, values: &[String]) -> Result<()> {
        self.write_line(values)
    }
}

/// Keeps every header and row in memory
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectedResults {
    /// One entry per query execution that produced rows
    pub headers: Vec<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSink for CollectedResults {
    fn header(&mut self, columns: &[String]) -> Result<()> {
        self.headers.push(columns.to_vec());
        Ok(())
    }

    fn row(&mut self, values: &[String]) -> Result<()> {
        self.rows.push(values.to_vec());
        Ok(())
    }
}
