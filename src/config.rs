use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::{LoadError, Result};

/// Everything a load run needs, passed in explicitly.
///
/// Missing keys in a YAML file fall back to the construction dataset preset
/// returned by [`LoaderConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,

    /// When set, the same source is also built into a timestamped snapshot here.
    pub backup_dir: Option<PathBuf>,

    /// When set, the primary build's report is written here as JSON.
    pub report_path: Option<PathBuf>,

    pub integer_columns: BTreeSet<String>,
    pub real_columns: BTreeSet<String>,

    /// Regular expressions consulted after the exact sets.
    pub integer_patterns: Vec<String>,
    pub real_patterns: Vec<String>,

    pub index_columns: Vec<String>,
    pub index_prefix: String,

    /// Stored for integer columns whose value is empty, absent or unparsable.
    pub integer_default: i64,

    pub columns: MetricColumns,

    /// Overrun multiplier applied when estimating actual cost from progress.
    pub actual_cost_factor: f64,
}

/// Column names the verification pass and EVMS formulas read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricColumns {
    pub total_cost: String,
    pub progress: String,
    pub finish_date: String,
}

impl Default for MetricColumns {
    fn default() -> Self {
        Self {
            total_cost: "R10_합계_금액".into(),
            progress: "WHEN4_실행률(%)".into(),
            finish_date: "WHEN2종료일".into(),
        }
    }
}

const INTEGER_COLUMNS: &[&str] = &[
    "R3_재료비_단가",
    "R4_노무비_단가",
    "R5_경비_단가",
    "R6_합계_단가",
    "R7_재료비_금액",
    "R8_노무비_금액",
    "R9_경비_금액",
    "R10_합계_금액",
    "WHEN3_기간(일)",
];

const REAL_COLUMNS: &[&str] = &["R2_수량", "WHEN4_실행률(%)"];

const INDEX_COLUMNS: &[&str] = &[
    "WHERE2_동",
    "HOW1_공사",
    "HOW2_대공종",
    "HOW4_품명",
    "WHO1_하도급업체",
    "WHEN1_시작일",
];

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from(".raw_db").join("step7_evms_02.csv"),
            destination_path: PathBuf::from("output").join("project_db_v2.sqlite"),
            backup_dir: Some(PathBuf::from(".created_db")),
            report_path: None,
            integer_columns: INTEGER_COLUMNS.iter().map(|s| s.to_string()).collect(),
            real_columns: REAL_COLUMNS.iter().map(|s| s.to_string()).collect(),
            integer_patterns: Vec::new(),
            real_patterns: Vec::new(),
            index_columns: INDEX_COLUMNS.iter().map(|s| s.to_string()).collect(),
            index_prefix: "idx_".into(),
            integer_default: 0,
            columns: MetricColumns::default(),
            actual_cost_factor: 1.05,
        }
    }
}

impl LoaderConfig {
    /// Load a YAML config file. Relative paths inside it stay relative to the
    /// process working directory.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LoadError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_yaml_str(&text).map_err(|source| LoadError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}
