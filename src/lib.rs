pub mod config;
pub mod error;
pub mod load;
pub mod process;
pub mod schema;
pub mod verify;

pub use config::LoaderConfig;
pub use error::LoadError;
pub use load::{build, run, LoadReport, LoadStage, RunSummary};

/// Name of the single relation every build produces.
pub const TABLE_NAME: &str = "evms";
