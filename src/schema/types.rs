// src/schema/types.rs

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};

/// Storage class a source column is loaded as.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A single column of the target table, named exactly as in the source header.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct ColumnDef {
    pub name: String,
    pub ty: SqlType,
}

/// Ordered column list for one table.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<SqlType> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.ty)
    }

    /// First column whose name repeats an earlier one under SQLite's
    /// ASCII case-insensitive identifier matching.
    pub fn duplicate_column(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .find(|name| !seen.insert(name.to_ascii_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(names: &[&str]) -> TableSchema {
        TableSchema {
            table: "evms".into(),
            columns: names
                .iter()
                .map(|n| ColumnDef { name: n.to_string(), ty: SqlType::Text })
                .collect(),
        }
    }

    #[test]
    fn duplicates_ignore_ascii_case() {
        assert_eq!(schema(&["id", "Cost", "cost"]).duplicate_column(), Some("cost"));
        assert_eq!(schema(&["a", "b", "a"]).duplicate_column(), Some("a"));
        assert_eq!(schema(&["HOW1_공사", "how1_공사 "]).duplicate_column(), None);
        assert_eq!(schema(&[]).duplicate_column(), None);
    }
}
