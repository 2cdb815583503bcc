//! Command line parsing
//!
//! `sqawk [RUN OPTIONS] ([FILE OPTIONS] FILE)... QUERY`
//!
//! File options are positional: each one applies to the first FILE that
//! follows it. clap records the argv index of every occurrence, which is how
//! options are matched to files after parsing.

use crate::config::{disk_database_path, parse_separator, ChunkSize, RunConfig, SourceConfig};
use crate::engine::DatabaseLocation;
use crate::error::{Result, SqawkError};
use crate::ingestion::schema_inference::ColumnRef;
use crate::ingestion::table_builder::{parse_column_list, ForeignKey};
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "sqawk")]
#[command(about = "Run SQL over delimited text files and streams")]
#[command(version)]
#[command(override_usage = "sqawk [RUN OPTIONS] ([FILE OPTIONS] FILE)... QUERY")]
pub struct Args {
    /// Log progress, the run configuration and inferred schemas to stderr
    #[arg(short = 'v', help_heading = "Run options")]
    pub verbose: bool,

    /// Generate SQL but do not execute it
    #[arg(short = 'n', help_heading = "Run options")]
    pub dry_run: bool,

    /// Keep the database on disk (SQAWK_DATABASE, default sqawk.db)
    #[arg(short = 'k', help_heading = "Run options")]
    pub keep: bool,

    /// Print generated SQL
    #[arg(short = 'q', help_heading = "Run options")]
    pub show_sql: bool,

    /// Rows per load/query/flush cycle for the last file, or "unbounded"
    #[arg(short = 'P', value_name = "N", help_heading = "Run options")]
    pub chunk_size: Option<ChunkSize>,

    /// Field separator (\t or tab for TAB)
    #[arg(
        short = 's',
        value_name = "CHAR",
        action = ArgAction::Append,
        allow_hyphen_values = true,
        help_heading = "File options",
    )]
    pub separator: Vec<String>,

    /// Skip lines until one matches REGEX
    #[arg(
        short = 'f',
        value_name = "REGEX",
        action = ArgAction::Append,
        help_heading = "File options",
    )]
    pub preamble: Vec<String>,

    /// Like -f, echoing skipped lines to stdout
    #[arg(
        short = 'F',
        value_name = "REGEX",
        action = ArgAction::Append,
        help_heading = "File options",
    )]
    pub preamble_echo: Vec<String>,

    /// First line is data; columns are named f1, f2, ...
    #[arg(
        short = 'H',
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = ArgAction::Append,
        help_heading = "File options",
    )]
    pub no_header: Vec<String>,

    /// Use header values verbatim as column names
    #[arg(
        short = 'l',
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = ArgAction::Append,
        help_heading = "File options",
    )]
    pub literal: Vec<String>,

    /// Columns (names or 1-based positions) forced to TEXT
    #[arg(
        short = 't',
        value_name = "LIST",
        action = ArgAction::Append,
        help_heading = "File options",
    )]
    pub text: Vec<String>,

    /// Primary key columns
    #[arg(
        short = 'p',
        value_name = "LIST",
        action = ArgAction::Append,
        help_heading = "File options",
    )]
    pub primary_key: Vec<String>,

    /// Foreign key column and the table(column) it references
    #[arg(
        short = 'K',
        num_args = 2,
        value_names = ["COLUMN", "REFERENT"],
        action = ArgAction::Append,
        help_heading = "File options",
    )]
    pub foreign_key: Vec<String>,

    /// Table name (default: derived from the file name)
    #[arg(
        short = 'a',
        value_name = "NAME",
        action = ArgAction::Append,
        help_heading = "File options",
    )]
    pub alias: Vec<String>,

    /// Columns to index
    #[arg(
        short = 'i',
        value_name = "LIST",
        action = ArgAction::Append,
        help_heading = "File options",
    )]
    pub index: Vec<String>,

    /// Input files (- for stdin) followed by the query
    #[arg(value_name = "FILE... QUERY", required = true, num_args = 1..)]
    pub inputs: Vec<String>,
}

pub fn command() -> clap::Command {
    Args::command()
}

/// Parse an argv (program name first) into a run configuration.
pub fn parse_from<I, T>(argv: I) -> Result<RunConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command()
        .try_get_matches_from(argv)
        .map_err(|e| SqawkError::Config(e.to_string()))?;
    build_config(&matches)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FileOption {
    Separator(String),
    Preamble { pattern: String, echo: bool },
    NoHeader,
    Literal,
    Text(String),
    PrimaryKey(String),
    ForeignKey(String, String),
    Alias(String),
    Index(String),
}

impl FileOption {
    fn apply(self, source: &mut SourceConfig) -> Result<()> {
        match self {
            FileOption::Separator(s) => source.separator = parse_separator(&s)?,
            FileOption::Preamble { pattern, echo } => {
                source.preamble = Some(pattern);
                source.echo_skipped = echo;
            }
            FileOption::NoHeader => source.no_header = true,
            FileOption::Literal => source.literal_column_names = true,
            FileOption::Text(list) => source.text_columns.extend(ColumnRef::parse_list(&list)),
            FileOption::PrimaryKey(list) => source.primary_key = parse_column_list(&list),
            FileOption::ForeignKey(column, referent) => {
                source.foreign_key = Some(ForeignKey { column, referent })
            }
            FileOption::Alias(name) => source.alias = Some(name),
            FileOption::Index(list) => source.index_columns = Some(list),
        }
        Ok(())
    }
}

/// `(argv index, value)` for every value of `id`
fn indexed_values(matches: &ArgMatches, id: &str) -> Vec<(usize, String)> {
    match (matches.indices_of(id), matches.get_many::<String>(id)) {
        (Some(indices), Some(values)) => indices.zip(values.cloned()).collect(),
        _ => Vec::new(),
    }
}

fn collect_file_options(matches: &ArgMatches) -> Vec<(usize, FileOption)> {
    let mut options = Vec::new();

    let single: [(&str, fn(String) -> FileOption); 6] = [
        ("separator", FileOption::Separator),
        ("text", FileOption::Text),
        ("primary_key", FileOption::PrimaryKey),
        ("alias", FileOption::Alias),
        ("index", FileOption::Index),
        ("preamble", |pattern| FileOption::Preamble { pattern, echo: false }),
    ];
    for (id, make) in single {
        options.extend(
            indexed_values(matches, id)
                .into_iter()
                .map(|(at, value)| (at, make(value))),
        );
    }
    options.extend(
        indexed_values(matches, "preamble_echo")
            .into_iter()
            .map(|(at, pattern)| (at, FileOption::Preamble { pattern, echo: true })),
    );
    options.extend(
        indexed_values(matches, "no_header")
            .into_iter()
            .map(|(at, _)| (at, FileOption::NoHeader)),
    );
    options.extend(
        indexed_values(matches, "literal")
            .into_iter()
            .map(|(at, _)| (at, FileOption::Literal)),
    );

    // -K takes two values per occurrence
    let keys = indexed_values(matches, "foreign_key");
    for pair in keys.chunks(2) {
        if let [(at, column), (_, referent)] = pair {
            options.push((*at, FileOption::ForeignKey(column.clone(), referent.clone())));
        }
    }

    options.sort_by_key(|(at, _)| *at);
    options
}

/// Turn parsed arguments into a `RunConfig`.
pub fn build_config(matches: &ArgMatches) -> Result<RunConfig> {
    let args = Args::from_arg_matches(matches).map_err(|e| SqawkError::Config(e.to_string()))?;

    let inputs = indexed_values(matches, "inputs");
    let (query, files) = match inputs.split_last() {
        Some((query, files)) if !files.is_empty() => (query.1.clone(), files),
        _ => {
            return Err(SqawkError::Config(
                "expected at least one FILE followed by a QUERY".to_string(),
            ))
        }
    };

    let mut sources: Vec<SourceConfig> = files
        .iter()
        .map(|(_, path)| SourceConfig::new(path.clone()))
        .collect();

    for (at, option) in collect_file_options(matches) {
        match files.iter().position(|(file_at, _)| *file_at > at) {
            Some(n) => option.apply(&mut sources[n])?,
            None => warn!("Ignoring {:?}: no FILE follows it", option),
        }
    }

    let mut config = RunConfig::new(query, sources);
    config.verbose = args.verbose;
    config.dry_run = args.dry_run;
    config.show_sql = args.show_sql;
    config.chunk_size = args.chunk_size.unwrap_or_default();
    if args.keep {
        config.database = DatabaseLocation::Disk(disk_database_path());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    fn parse(args: &[&str]) -> RunConfig {
        let argv = std::iter::once("sqawk").chain(args.iter().copied());
        parse_from(argv).unwrap()
    }

    #[test]
    fn test_single_file_defaults() {
        let config = parse(&["primates.tsv", "SELECT * FROM primates"]);
        assert_eq!(config.query, "SELECT * FROM primates");
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0], SourceConfig::new("primates.tsv"));
        assert_eq!(config.chunk_size, ChunkSize::Unbounded);
        assert_eq!(config.database, DatabaseLocation::Memory);
        assert!(!config.dry_run && !config.show_sql && !config.verbose);
    }

    #[test]
    fn test_run_options() {
        let config = parse(&["-v", "-q", "-n", "-P", "100", "-", "SELECT 1"]);
        assert!(config.verbose && config.show_sql && config.dry_run);
        assert_eq!(config.chunk_size, ChunkSize::Rows(NonZeroUsize::new(100).unwrap()));
        assert!(config.sources[0].is_stdin());
    }

    #[test]
    fn test_file_options_attach_to_next_file() {
        let config = parse(&[
            "-s", ",", "-H", "-a", "genera", "genera.csv",
            "-t", "1,name", "-p", "id", "-K", "genus", "genera(f1)", "-i", "genus", "-",
            "SELECT * FROM genera JOIN stdin USING (genus)",
        ]);
        let genera = &config.sources[0];
        assert_eq!(genera.separator, ',');
        assert!(genera.no_header);
        assert_eq!(genera.alias.as_deref(), Some("genera"));
        assert!(genera.foreign_key.is_none());

        let stdin = &config.sources[1];
        assert_eq!(stdin.separator, '\t');
        assert!(!stdin.no_header);
        assert_eq!(
            stdin.text_columns,
            vec![ColumnRef::Position(1), ColumnRef::Name("name".into())]
        );
        assert_eq!(stdin.primary_key, vec!["id".to_string()]);
        assert_eq!(
            stdin.foreign_key,
            Some(ForeignKey {
                column: "genus".into(),
                referent: "genera(f1)".into()
            })
        );
        assert_eq!(stdin.index_columns.as_deref(), Some("genus"));
        assert!(config.foreign_keys_enabled());
    }

    #[test]
    fn test_preamble_options() {
        let config = parse(&["-f", "^[A-Z]", "a.tsv", "-F", "^#", "b.tsv", "SELECT 1"]);
        assert_eq!(config.sources[0].preamble.as_deref(), Some("^[A-Z]"));
        assert!(!config.sources[0].echo_skipped);
        assert_eq!(config.sources[1].preamble.as_deref(), Some("^#"));
        assert!(config.sources[1].echo_skipped);
    }

    #[test]
    fn test_tab_separator_spellings() {
        let config = parse(&["-s", "\\t", "a.tsv", "-s", "tab", "b.tsv", "SELECT 1"]);
        assert_eq!(config.sources[0].separator, '\t');
        assert_eq!(config.sources[1].separator, '\t');
    }

    #[test]
    fn test_trailing_file_option_is_ignored() {
        let config = parse(&["a.tsv", "-H", "SELECT 1"]);
        assert_eq!(config.query, "SELECT 1");
        assert!(!config.sources[0].no_header);
    }

    #[test]
    fn test_missing_query_is_an_error() {
        assert!(parse_from(["sqawk", "a.tsv"]).is_err());
        assert!(parse_from(["sqawk"]).is_err());
    }

    #[test]
    fn test_bad_values_are_errors() {
        assert!(parse_from(["sqawk", "-P", "0", "a.tsv", "SELECT 1"]).is_err());
        assert!(parse_from(["sqawk", "-s", "ab", "a.tsv", "SELECT 1"]).is_err());
    }

    #[test]
    fn test_keep_uses_disk_database() {
        let config = parse(&["-k", "a.tsv", "SELECT 1"]);
        assert!(matches!(config.database, DatabaseLocation::Disk(_)));
    }
}
