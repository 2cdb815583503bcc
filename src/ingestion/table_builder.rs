//! Table Builder - Turns a source's header and first row into a table definition
//!
//! Holds the per-table options (name, forced TEXT columns, keys, index) and
//! checks that every column they mention exists before anything reaches the
//! engine.

use crate::error::{Result, SqawkError};
use crate::ingestion::line_source::LineSource;
use crate::ingestion::schema_inference::{
    sanitize_identifier, ColumnRef, ColumnSchema, SchemaInference,
};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;

/// `FOREIGN KEY (column) REFERENCES referent`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub referent: String,
}

/// Everything the engine needs to create (and index) one table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub schema: ColumnSchema,
    pub primary_key: Vec<String>,
    pub foreign_key: Option<ForeignKey>,
    pub index_columns: Option<String>,
}

pub struct TableBuilder {
    name: String,
    literal_names: bool,
    text_columns: Vec<ColumnRef>,
    primary_key: Vec<String>,
    foreign_key: Option<ForeignKey>,
    index_columns: Option<String>,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            literal_names: false,
            text_columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_key: None,
            index_columns: None,
        }
    }

    pub fn with_literal_names(mut self, literal: bool) -> Self {
        self.literal_names = literal;
        self
    }

    pub fn with_text_columns(mut self, columns: Vec<ColumnRef>) -> Self {
        self.text_columns = columns;
        self
    }

    pub fn with_primary_key(mut self, columns: Vec<String>) -> Self {
        self.primary_key = columns;
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: Option<ForeignKey>) -> Self {
        self.foreign_key = foreign_key;
        self
    }

    pub fn with_index(mut self, columns: Option<String>) -> Self {
        self.index_columns = columns;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Infer the schema from the source's cached header and first data line.
    pub fn build_from_source<R: BufRead>(&self, source: &LineSource<R>) -> Result<TableDefinition> {
        let header = match source.header() {
            Some(_) => Some(source.header_fields()?),
            None => None,
        };
        let sample = source.first_data_fields()?;

        let schema = SchemaInference::new()
            .with_literal_names(self.literal_names)
            .infer(header.as_deref(), &sample, &self.text_columns)?;

        self.build(schema)
    }

    /// Attach keys and index to an already inferred schema.
    pub fn build(&self, schema: ColumnSchema) -> Result<TableDefinition> {
        for column in &self.primary_key {
            require_column(&schema, column, "primary key")?;
        }
        if let Some(fk) = &self.foreign_key {
            require_column(&schema, &fk.column, "foreign key")?;
        }

        Ok(TableDefinition {
            name: self.name.clone(),
            schema,
            primary_key: self.primary_key.clone(),
            foreign_key: self.foreign_key.clone(),
            index_columns: self.index_columns.clone(),
        })
    }
}

fn require_column(schema: &ColumnSchema, column: &str, role: &str) -> Result<()> {
    match schema.index_of(column) {
        Some(_) => Ok(()),
        None => Err(SqawkError::AmbiguousReference(format!(
            "{} column '{}' is not in the table (columns: {})",
            role,
            column,
            schema.names().collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// Table name for a source path: `-` reads stdin and maps to `stdin`;
/// otherwise the file name without directory and extension, sanitized.
pub fn table_name_for_source(path: &str) -> String {
    if path == "-" {
        return "stdin".to_string();
    }
    let base = Path::new(path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let stem = match base.rfind('.') {
        Some(dot) => &base[..dot],
        None => base.as_str(),
    };
    sanitize_identifier(stem)
}

/// Split a comma-separated column list, trimming blanks.
pub fn parse_column_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::line_source::LineSourceOptions;
    use crate::ingestion::schema_inference::ColumnType;
    use std::io::{self, Cursor};

    fn source(text: &str) -> LineSource<Cursor<Vec<u8>>> {
        LineSource::open(
            Cursor::new(text.as_bytes().to_vec()),
            &LineSourceOptions { separator: ',', ..Default::default() },
            &mut io::sink(),
        )
        .unwrap()
    }

    #[test]
    fn test_table_name_for_source() {
        assert_eq!(table_name_for_source("-"), "stdin");
        assert_eq!(table_name_for_source("data/primates.tsv"), "primates");
        assert_eq!(table_name_for_source("/tmp/my-data.v1.csv"), "my_data_v1");
        assert_eq!(table_name_for_source("noext"), "noext");
    }

    #[test]
    fn test_build_from_source() {
        let src = source("id,name,zip\n1,Ann,02134\n");
        let table = TableBuilder::new("people")
            .with_text_columns(vec![ColumnRef::Name("zip".into())])
            .with_primary_key(vec!["id".into()])
            .build_from_source(&src)
            .unwrap();
        assert_eq!(table.name, "people");
        let types: Vec<_> = table.schema.columns.iter().map(|c| c.data_type).collect();
        assert_eq!(types, vec![ColumnType::Numeric, ColumnType::Text, ColumnType::Text]);
        assert_eq!(table.primary_key, vec!["id".to_string()]);
    }

    #[test]
    fn test_unknown_primary_key_column() {
        let src = source("id,name\n1,Ann\n");
        let result = TableBuilder::new("people")
            .with_primary_key(vec!["uid".into()])
            .build_from_source(&src);
        assert!(matches!(result, Err(SqawkError::AmbiguousReference(_))));
    }

    #[test]
    fn test_unknown_foreign_key_column() {
        let src = source("id,name\n1,Ann\n");
        let result = TableBuilder::new("people")
            .with_foreign_key(Some(ForeignKey {
                column: "owner".into(),
                referent: "owners(id)".into(),
            }))
            .build_from_source(&src);
        assert!(matches!(result, Err(SqawkError::AmbiguousReference(_))));
    }

    #[test]
    fn test_parse_column_list() {
        assert_eq!(parse_column_list("a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_column_list("").is_empty());
    }
}
