//! Run configuration
//!
//! Built once from the command line and passed down by reference; nothing in
//! the library reads process-wide flags.

use crate::engine::{DatabaseLocation, EngineOptions};
use crate::error::{Result, SqawkError};
use crate::ingestion::line_source::LineSourceOptions;
use crate::ingestion::schema_inference::ColumnRef;
use crate::ingestion::table_builder::{table_name_for_source, ForeignKey, TableBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DISK_DATABASE: &str = "sqawk.db";

/// On-disk database file: `SQAWK_DATABASE`, or `sqawk.db`.
pub fn disk_database_path() -> PathBuf {
    std::env::var("SQAWK_DATABASE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DISK_DATABASE))
}

/// Rows per load/query/flush cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkSize {
    Rows(NonZeroUsize),
    /// Whole source in one batch
    Unbounded,
}

impl ChunkSize {
    pub fn is_full(&self, loaded: usize) -> bool {
        match self {
            ChunkSize::Rows(n) => loaded >= n.get(),
            ChunkSize::Unbounded => false,
        }
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        ChunkSize::Unbounded
    }
}

impl FromStr for ChunkSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") || s.eq_ignore_ascii_case("all") {
            return Ok(ChunkSize::Unbounded);
        }
        s.parse::<NonZeroUsize>()
            .map(ChunkSize::Rows)
            .map_err(|_| {
                format!(
                    "chunk size must be a positive integer or 'unbounded', got '{}'",
                    s
                )
            })
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkSize::Rows(n) => write!(f, "{}", n),
            ChunkSize::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// `-s` value to separator: a single character, or `\t` / `tab` for TAB.
pub fn parse_separator(value: &str) -> Result<char> {
    match value {
        "\\t" | "tab" | "TAB" => return Ok('\t'),
        _ => {}
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(SqawkError::Config(format!(
            "separator must be a single character, got '{}'",
            value
        ))),
    }
}

/// Options for one input source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// File path, or `-` for stdin
    pub path: String,
    pub separator: char,
    pub preamble: Option<String>,
    pub echo_skipped: bool,
    pub no_header: bool,
    pub literal_column_names: bool,
    pub text_columns: Vec<ColumnRef>,
    pub primary_key: Vec<String>,
    pub foreign_key: Option<ForeignKey>,
    pub alias: Option<String>,
    pub index_columns: Option<String>,
}

impl SourceConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            separator: '\t',
            preamble: None,
            echo_skipped: false,
            no_header: false,
            literal_column_names: false,
            text_columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_key: None,
            alias: None,
            index_columns: None,
        }
    }

    pub fn is_stdin(&self) -> bool {
        self.path == "-"
    }

    pub fn display_name(&self) -> &str {
        if self.is_stdin() {
            "stdin"
        } else {
            &self.path
        }
    }

    pub fn table_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| table_name_for_source(&self.path))
    }

    pub fn line_source_options(&self) -> LineSourceOptions {
        LineSourceOptions {
            separator: self.separator,
            preamble: self.preamble.clone(),
            no_header: self.no_header,
            echo_skipped: self.echo_skipped,
        }
    }

    pub fn table_builder(&self) -> TableBuilder {
        TableBuilder::new(self.table_name())
            .with_literal_names(self.literal_column_names)
            .with_text_columns(self.text_columns.clone())
            .with_primary_key(self.primary_key.clone())
            .with_foreign_key(self.foreign_key.clone())
            .with_index(self.index_columns.clone())
    }
}

/// Whole-run configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub database: DatabaseLocation,
    pub verbose: bool,
    pub dry_run: bool,
    pub show_sql: bool,
    /// Applies to the last source; earlier sources are always loaded whole
    pub chunk_size: ChunkSize,
    pub query: String,
    pub sources: Vec<SourceConfig>,
}

impl RunConfig {
    pub fn new(query: impl Into<String>, sources: Vec<SourceConfig>) -> Self {
        Self {
            database: DatabaseLocation::Memory,
            verbose: false,
            dry_run: false,
            show_sql: false,
            chunk_size: ChunkSize::Unbounded,
            query: query.into(),
            sources,
        }
    }

    pub fn foreign_keys_enabled(&self) -> bool {
        self.sources.iter().any(|s| s.foreign_key.is_some())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            show_sql: self.show_sql,
            dry_run: self.dry_run,
            foreign_keys: self.foreign_keys_enabled(),
        }
    }
}
