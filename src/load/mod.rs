use chrono::{Local, NaiveDateTime};
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, info_span, warn};

use crate::config::LoaderConfig;
use crate::error::{LoadError, Result};
use crate::process::{
    convert_record, CellValue, Conversion, ConversionPolicy, ConversionStats, SourceReader,
};
use crate::schema::{ddl, derive_schema, Classifier, TableSchema};
use crate::verify::{self, VerificationSummary};
use crate::TABLE_NAME;

/// Linear progression of a single build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadStage {
    Start,
    SchemaCreated,
    RowsLoaded,
    IndexesBuilt,
    Verified,
    Done,
}

/// What one build produced.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub destination: PathBuf,
    pub schema: TableSchema,
    pub rows: u64,
    /// Sum of the configured cost column, 0 when there is nothing to sum.
    pub total_cost: f64,
    pub conversions: ConversionStats,
    pub indexes_created: Vec<String>,
    /// Configured index columns that the source did not have.
    pub indexes_skipped: Vec<String>,
    pub verification: VerificationSummary,
    pub size_bytes: u64,
}

/// Primary build plus the optional timestamped snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub primary: LoadReport,
    pub backup: Option<LoadReport>,
}

/// Build the primary artifact, write the JSON report if configured, then the
/// backup snapshot if configured.
pub fn run(cfg: &LoaderConfig) -> Result<RunSummary> {
    let primary = build(cfg, &cfg.destination_path)?;

    if let Some(report_path) = &cfg.report_path {
        write_report(report_path, &primary)?;
        info!("wrote report {}", report_path.display());
    }

    let backup = match &cfg.backup_dir {
        Some(dir) => {
            let path = backup_path(dir, &cfg.destination_path, Local::now().naive_local());
            Some(build(cfg, &path)?)
        }
        None => None,
    };

    Ok(RunSummary { primary, backup })
}

/// Rebuild `destination` from `cfg.source_path`.
///
/// Any existing file at `destination` is removed first; nothing is appended.
pub fn build(cfg: &LoaderConfig, destination: &Path) -> Result<LoadReport> {
    let span = info_span!("build", db = %destination.display());
    let _enter = span.enter();

    let classifier = Classifier::from_config(cfg)?;
    let policy = ConversionPolicy {
        integer_default: cfg.integer_default,
    };

    // ─── 1) open source, derive schema, reset destination ─────────────
    let mut reader = SourceReader::open(&cfg.source_path)?;
    let schema = derive_schema(TABLE_NAME, reader.headers(), &classifier);
    if let Some(name) = schema.duplicate_column() {
        return Err(LoadError::DuplicateColumn {
            path: cfg.source_path.clone(),
            name: name.to_string(),
        });
    }
    prepare_destination(destination)?;

    let mut stage = LoadStage::Start;
    let mut conn = Connection::open(destination)?;

    // ─── 2) create table ──────────────────────────────────────────────
    conn.execute(&ddl::create_table_sql(&schema), [])?;
    advance(&mut stage, LoadStage::SchemaCreated);

    // ─── 3) stream rows in source order, one transaction ──────────────
    let mut rows: u64 = 0;
    let mut conversions = ConversionStats::default();
    {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&ddl::insert_sql(&schema))?;
            while let Some(record) = reader.next_record()? {
                let values: Vec<CellValue> = convert_record(&schema, &record, &policy)
                    .into_iter()
                    .inspect(|c| conversions.record(c))
                    .map(Conversion::into_value)
                    .collect();
                stmt.execute(params_from_iter(values.iter()))?;
                rows += 1;
            }
        }
        tx.commit()?;
    }
    info!("CSV: {} rows x {} cols", rows, schema.columns.len());
    if conversions.defaulted_on_error > 0 {
        warn!(
            "{} numeric fields were unparsable and defaulted",
            conversions.defaulted_on_error
        );
    }
    advance(&mut stage, LoadStage::RowsLoaded);

    // ─── 4) indexes after the bulk load ──────────────────────────────
    let (indexes_created, indexes_skipped) = create_indexes(&conn, &schema, cfg)?;
    advance(&mut stage, LoadStage::IndexesBuilt);

    // ─── 5) verification aggregates ──────────────────────────────────
    let verification = verify::verify(&conn, &schema, &cfg.columns);
    verify::log_summary(&verification);
    advance(&mut stage, LoadStage::Verified);

    conn.close().map_err(|(_, e)| LoadError::Database(e))?;

    // ─── 6) report ───────────────────────────────────────────────────
    let size_bytes = fs::metadata(destination)
        .map_err(|source| LoadError::Destination {
            path: destination.to_path_buf(),
            source,
        })?
        .len();
    let total_cost = verification.total_cost.unwrap_or(0.0);
    info!(
        "DB: {} | {} rows | Total: {:.0} | Size: {} bytes",
        destination.display(),
        rows,
        total_cost,
        size_bytes
    );
    advance(&mut stage, LoadStage::Done);

    Ok(LoadReport {
        destination: destination.to_path_buf(),
        schema,
        rows,
        total_cost,
        conversions,
        indexes_created,
        indexes_skipped,
        verification,
        size_bytes,
    })
}

fn advance(stage: &mut LoadStage, next: LoadStage) {
    debug!(from = ?stage, to = ?next, "stage");
    *stage = next;
}

/// Remove whatever is at `path` and make sure its directory exists.
fn prepare_destination(path: &Path) -> Result<()> {
    let dest_err = |source| LoadError::Destination {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(dest_err)?;
    }
    if path.exists() {
        fs::remove_file(path).map_err(dest_err)?;
        debug!("removed previous {}", path.display());
    }
    Ok(())
}

fn create_indexes(
    conn: &Connection,
    schema: &TableSchema,
    cfg: &LoaderConfig,
) -> Result<(Vec<String>, Vec<String>)> {
    let mut created: Vec<String> = Vec::new();
    let mut skipped = Vec::new();

    for column in &cfg.index_columns {
        if !schema.contains(column) {
            warn!("index column `{}` not in source, skipping", column);
            skipped.push(column.clone());
            continue;
        }
        let name = ddl::index_name(&cfg.index_prefix, column);
        if created.contains(&name) {
            continue;
        }
        conn.execute(&ddl::create_index_sql(&schema.table, &name, column), [])?;
        created.push(name);
    }

    debug!("created {} indexes", created.len());
    Ok((created, skipped))
}

/// `<dir>/<stem>_v<YYYYMMDD_HHMMSS>.<ext>`, where a trailing `_v<digits>` on
/// the destination stem is replaced by the timestamp.
pub fn backup_path(dir: &Path, destination: &Path, now: NaiveDateTime) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| TABLE_NAME.to_string());
    let base = match stem.rfind("_v") {
        Some(idx)
            if idx + 2 < stem.len() && stem[idx + 2..].chars().all(|c| c.is_ascii_digit()) =>
        {
            &stem[..idx]
        }
        _ => stem.as_str(),
    };
    let ext = destination
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sqlite".to_string());
    dir.join(format!("{}_v{}.{}", base, now.format("%Y%m%d_%H%M%S"), ext))
}

fn write_report(path: &Path, report: &LoadReport) -> Result<()> {
    let report_err = |message: String| LoadError::Report {
        path: path.to_path_buf(),
        message,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| report_err(e.to_string()))?;
    }
    let mut json = serde_json::to_string_pretty(report).map_err(|e| report_err(e.to_string()))?;
    json.push('\n');
    fs::write(path, json).map_err(|e| report_err(e.to_string()))
}
