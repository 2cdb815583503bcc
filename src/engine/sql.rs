//! SQL text for the statements the engine runs on the pipeline's behalf

use crate::ingestion::schema_inference::ColumnSchema;
use crate::ingestion::TableDefinition;
use itertools::Itertools;

/// Double-quote an identifier, doubling any embedded quote.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_identifier(schema: &ColumnSchema, name: &str) -> String {
    if schema.literal_names {
        quote_identifier(name)
    } else {
        name.to_string()
    }
}

pub fn create_table(table: &TableDefinition) -> String {
    let schema = &table.schema;
    let mut parts: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", column_identifier(schema, &c.name), c.data_type.sql_name()))
        .collect();

    if !table.primary_key.is_empty() {
        parts.push(format!(
            "PRIMARY KEY ({})",
            table.primary_key.iter().map(|c| column_identifier(schema, c)).join(", ")
        ));
    }
    if let Some(fk) = &table.foreign_key {
        parts.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}",
            column_identifier(schema, &fk.column),
            fk.referent
        ));
    }

    format!("CREATE TABLE {} ({});", table.name, parts.join(", "))
}

pub fn insert(table: &str, column_count: usize) -> String {
    format!(
        "INSERT INTO {} VALUES ({})",
        table,
        std::iter::repeat("?").take(column_count).join(", ")
    )
}

pub fn create_index(table: &str, columns: &str) -> String {
    format!(
        "CREATE INDEX {} ON {} ({})",
        quote_identifier(&format!("{}:{}", table, columns)),
        table,
        columns
    )
}

pub fn delete_all(table: &str) -> String {
    format!("DELETE FROM {}", table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::schema_inference::{ColumnType, InferredColumn};
    use crate::ingestion::ForeignKey;

    fn table(literal: bool) -> TableDefinition {
        TableDefinition {
            name: "primates".into(),
            schema: ColumnSchema {
                columns: vec![
                    InferredColumn { name: "Genus".into(), data_type: ColumnType::Text },
                    InferredColumn { name: "nb_species".into(), data_type: ColumnType::Numeric },
                ],
                literal_names: literal,
            },
            primary_key: Vec::new(),
            foreign_key: None,
            index_columns: None,
        }
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            create_table(&table(false)),
            "CREATE TABLE primates (Genus TEXT, nb_species NUMERIC);"
        );
    }

    #[test]
    fn test_create_table_with_constraints() {
        let mut t = table(false);
        t.primary_key = vec!["Genus".into()];
        t.foreign_key = Some(ForeignKey {
            column: "Genus".into(),
            referent: "genera(name)".into(),
        });
        assert_eq!(
            create_table(&t),
            "CREATE TABLE primates (Genus TEXT, nb_species NUMERIC, PRIMARY KEY (Genus), \
             FOREIGN KEY (Genus) REFERENCES genera(name));"
        );
    }

    #[test]
    fn test_literal_names_are_quoted() {
        assert_eq!(
            create_table(&table(true)),
            "CREATE TABLE primates (\"Genus\" TEXT, \"nb_species\" NUMERIC);"
        );
        assert_eq!(quote_identifier("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_insert_and_index() {
        assert_eq!(insert("t", 3), "INSERT INTO t VALUES (?, ?, ?)");
        assert_eq!(create_index("t", "a,b"), "CREATE INDEX \"t:a,b\" ON t (a,b)");
        assert_eq!(delete_all("t"), "DELETE FROM t");
    }
}
