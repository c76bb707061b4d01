pub mod classify;
pub mod ddl;
pub mod derive;
pub mod types;

pub use classify::Classifier;
pub use derive::derive_schema;
pub use types::{ColumnDef, SqlType, TableSchema};
