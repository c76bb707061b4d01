use tracing::debug;

use super::{Classifier, ColumnDef, SqlType, TableSchema};

/// Build the target schema from the source header, one column per header
/// entry in header order.
///
/// Header names are kept verbatim; there is no failure mode, an unknown
/// column is simply Text.
pub fn derive_schema(table: &str, header_names: &[String], classifier: &Classifier) -> TableSchema {
    let columns: Vec<ColumnDef> = header_names
        .iter()
        .map(|name| ColumnDef {
            name: name.clone(),
            ty: classifier.classify(name),
        })
        .collect();

    let numeric = columns.iter().filter(|c| c.ty != SqlType::Text).count();
    debug!(
        "derive_schema: `{}` has {} columns ({} numeric)",
        table,
        columns.len(),
        numeric
    );

    TableSchema {
        table: table.to_string(),
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keeps_header_order_and_types() {
        let classifier = Classifier::new(
            ["cost".to_string()].into_iter().collect(),
            ["progress".to_string()].into_iter().collect(),
        );
        let schema = derive_schema("evms", &names(&["id", "cost", "progress"]), &classifier);

        assert_eq!(schema.table, "evms");
        assert_eq!(
            schema.columns,
            vec![
                ColumnDef { name: "id".into(), ty: SqlType::Text },
                ColumnDef { name: "cost".into(), ty: SqlType::Integer },
                ColumnDef { name: "progress".into(), ty: SqlType::Real },
            ]
        );
    }

    #[test]
    fn empty_classification_defaults_to_text() {
        let classifier = Classifier::new(BTreeSet::new(), BTreeSet::new());
        let schema = derive_schema("evms", &names(&["R10_합계_금액", "select"]), &classifier);
        assert!(schema.columns.iter().all(|c| c.ty == SqlType::Text));
        assert_eq!(schema.column_type("select"), Some(SqlType::Text));
        assert_eq!(schema.column_type("nope"), None);
    }
}
