//! Schema Inference - Column names and types from a header and one sample row
//!
//! A column is NUMERIC when its sampled value parses in full as a real number,
//! TEXT otherwise. Overrides can force any column to TEXT afterwards.

use crate::error::{Result, SqawkError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Text,
}

impl ColumnType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "NUMERIC",
            ColumnType::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredColumn {
    pub name: String,
    pub data_type: ColumnType,
}

/// Ordered column definitions for one table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub columns: Vec<InferredColumn>,

    /// Names are the raw header values and must be quoted in SQL
    pub literal_names: bool,
}

impl ColumnSchema {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Resolve a column reference to a 0-based index.
    pub fn resolve(&self, column: &ColumnRef) -> Result<usize> {
        match column {
            ColumnRef::Position(pos) if (1..=self.len()).contains(pos) => Ok(pos - 1),
            ColumnRef::Position(pos) => Err(SqawkError::AmbiguousReference(format!(
                "column position {} is outside 1..={}",
                pos,
                self.len()
            ))),
            ColumnRef::Name(name) => self.index_of(name).ok_or_else(|| {
                SqawkError::AmbiguousReference(format!("no column named '{}'", name))
            }),
        }
    }
}

/// A column designated by name or by 1-based position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRef {
    Name(String),
    Position(usize),
}

impl ColumnRef {
    /// Parse a comma-separated list such as `id,3,label`.
    pub fn parse_list(list: &str) -> Vec<ColumnRef> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect()
    }
}

impl FromStr for ColumnRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(pos) = s.parse() {
                return Ok(ColumnRef::Position(pos));
            }
        }
        Ok(ColumnRef::Name(s.to_string()))
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Name(name) => f.write_str(name),
            ColumnRef::Position(pos) => write!(f, "{}", pos),
        }
    }
}

/// Schema Inference Engine
pub struct SchemaInference {
    literal_names: bool,
}

impl SchemaInference {
    pub fn new() -> Self {
        Self {
            literal_names: false,
        }
    }

    pub fn with_literal_names(mut self, literal: bool) -> Self {
        self.literal_names = literal;
        self
    }

    /// Build a schema from the header fields (`None` when the source has no
    /// header) and one sampled data row, then apply the TEXT overrides.
    pub fn infer(
        &self,
        header: Option<&[String]>,
        sample: &[String],
        text_overrides: &[ColumnRef],
    ) -> Result<ColumnSchema> {
        let columns = sample
            .iter()
            .enumerate()
            .map(|(i, value)| InferredColumn {
                name: self.column_name(header.and_then(|h| h.get(i)), i),
                data_type: if is_numeric(value) {
                    ColumnType::Numeric
                } else {
                    ColumnType::Text
                },
            })
            .collect();

        let mut schema = ColumnSchema {
            columns,
            literal_names: self.literal_names,
        };
        apply_text_overrides(&mut schema, text_overrides)?;

        for col in &schema.columns {
            debug!("column {} {}", col.name, col.data_type);
        }

        Ok(schema)
    }

    fn column_name(&self, header_value: Option<&String>, index: usize) -> String {
        let name = match header_value {
            Some(raw) if self.literal_names => raw.clone(),
            Some(raw) => sanitize_identifier(raw),
            None => String::new(),
        };
        if name.is_empty() {
            format!("f{}", index + 1)
        } else {
            name
        }
    }
}

impl Default for SchemaInference {
    fn default() -> Self {
        Self::new()
    }
}

/// Force the referenced columns to TEXT. Applying the same list twice is the
/// same as applying it once.
pub fn apply_text_overrides(schema: &mut ColumnSchema, overrides: &[ColumnRef]) -> Result<()> {
    for column in overrides {
        let index = schema.resolve(column)?;
        schema.columns[index].data_type = ColumnType::Text;
    }
    Ok(())
}

/// True when the whole value parses as a real number. Empty values and values
/// starting with whitespace are never numeric.
pub fn is_numeric(value: &str) -> bool {
    match value.chars().next() {
        None => false,
        Some(c) if c.is_whitespace() => false,
        Some(_) => value.parse::<f64>().is_ok(),
    }
}

/// Turn a free-form name (file or header value) into a plain SQL identifier:
/// `-`, space and `.` become `_`, `#` is dropped.
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .filter(|&c| c != '#')
        .map(|c| match c {
            '-' | ' ' | '.' => '_',
            other => other,
        })
        .collect()
}
