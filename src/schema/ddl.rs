//! SQL text for the target table. All identifier quoting lives here.

use super::TableSchema;

/// Quote an identifier for SQLite, doubling any embedded `"`.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn create_table_sql(schema: &TableSchema) -> String {
    let defs: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.ty.as_sql()))
        .collect();
    format!(
        "CREATE TABLE {} ({})",
        quote_ident(&schema.table),
        defs.join(", ")
    )
}

pub fn insert_sql(schema: &TableSchema) -> String {
    let placeholders = vec!["?"; schema.columns.len()].join(", ");
    format!(
        "INSERT INTO {} VALUES ({})",
        quote_ident(&schema.table),
        placeholders
    )
}

pub fn index_name(prefix: &str, column: &str) -> String {
    format!("{}{}", prefix, column)
}

pub fn create_index_sql(table: &str, index: &str, column: &str) -> String {
    format!(
        "CREATE INDEX {} ON {} ({})",
        quote_ident(index),
        quote_ident(table),
        quote_ident(column)
    )
}
