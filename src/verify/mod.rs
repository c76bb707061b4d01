pub mod evms;

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::MetricColumns;
use crate::schema::{ddl::quote_ident, ColumnDef, SqlType, TableSchema};

pub use evms::{compute_metrics, EvmsMetrics};

/// Read-only sanity aggregates over a freshly built table.
///
/// Every line is optional: `None` means "no data", either because the table is
/// empty, the column is not present, or the query itself failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationSummary {
    pub row_count: Option<u64>,
    pub total_cost: Option<f64>,
    pub progress: Option<ProgressStats>,
    pub earned_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressStats {
    /// Rows with a non-null progress value.
    pub with_progress: u64,
    /// Rows whose progress has reached 1.0.
    pub completed: u64,
    pub average: f64,
}

/// Run the verification battery. Never fails; a broken aggregate only blanks
/// its own line.
pub fn verify(
    conn: &Connection,
    schema: &TableSchema,
    columns: &MetricColumns,
) -> VerificationSummary {
    let table = quote_ident(&schema.table);
    let has_cost = schema.contains(&columns.total_cost);
    let has_progress = schema.contains(&columns.progress);

    let row_count =
        scalar_f64(conn, &format!("SELECT COUNT(*) FROM {table}")).map(|n| n as u64);

    let total_cost = if has_cost {
        scalar_f64(
            conn,
            &format!("SELECT SUM({}) FROM {table}", quote_ident(&columns.total_cost)),
        )
    } else {
        warn!("verify: cost column `{}` not present", columns.total_cost);
        None
    };

    let progress = if has_progress {
        progress_stats(conn, &table, &quote_ident(&columns.progress))
    } else {
        warn!("verify: progress column `{}` not present", columns.progress);
        None
    };

    let earned_value = if has_cost && has_progress {
        scalar_f64(
            conn,
            &format!(
                "SELECT SUM({} * COALESCE({}, 0)) FROM {table}",
                quote_ident(&columns.total_cost),
                quote_ident(&columns.progress)
            ),
        )
    } else {
        None
    };

    VerificationSummary {
        row_count,
        total_cost,
        progress,
        earned_value,
    }
}

/// Rebuild a table's schema from the SQLite catalog. Declared types other
/// than INTEGER and REAL (any case) map to TEXT. A missing table yields an
/// empty column list.
pub fn read_schema(conn: &Connection, table: &str) -> rusqlite::Result<TableSchema> {
    let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table], |r| {
            let name: String = r.get(0)?;
            let ty: String = r.get(1)?;
            let ty = match ty.to_ascii_uppercase().as_str() {
                "INTEGER" => SqlType::Integer,
                "REAL" => SqlType::Real,
                _ => SqlType::Text,
            };
            Ok(ColumnDef { name, ty })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(TableSchema {
        table: table.to_string(),
        columns,
    })
}

/// Shared by the loader and `evms-verify`.
pub(crate) fn progress_stats(
    conn: &Connection,
    table: &str,
    progress: &str,
) -> Option<ProgressStats> {
    let sql = format!(
        "SELECT COUNT({p}), SUM(CASE WHEN {p} >= 1 THEN 1 ELSE 0 END), AVG({p}) FROM {table}",
        p = progress
    );
    let res = conn.query_row(&sql, [], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, Option<i64>>(1)?,
            r.get::<_, Option<f64>>(2)?,
        ))
    });
    match res {
        Ok((n, completed, Some(avg))) if n > 0 => Some(ProgressStats {
            with_progress: n as u64,
            completed: completed.unwrap_or(0) as u64,
            average: avg,
        }),
        Ok(_) => None,
        Err(e) => {
            warn!("verify: progress aggregate failed: {}", e);
            None
        }
    }
}

/// Single numeric aggregate; NULL and errors both come back as `None`.
pub(crate) fn scalar_f64(conn: &Connection, sql: &str) -> Option<f64> {
    match conn
        .query_row(sql, [], |r| r.get::<_, Option<f64>>(0))
        .optional()
    {
        Ok(v) => v.flatten(),
        Err(e) => {
            warn!("verify: `{}` failed: {}", sql, e);
            None
        }
    }
}

/// Log one line per aggregate.
pub fn log_summary(summary: &VerificationSummary) {
    match summary.row_count {
        Some(n) => info!("verify: rows = {}", n),
        None => info!("verify: rows = no data"),
    }
    match summary.total_cost {
        Some(t) => info!("verify: total cost = {:.0}", t),
        None => info!("verify: total cost = no data"),
    }
    match &summary.progress {
        Some(p) => info!(
            "verify: progress entered on {} rows ({} complete), avg {:.1}%",
            p.with_progress,
            p.completed,
            p.average * 100.0
        ),
        None => info!("verify: progress = no data"),
    }
    match summary.earned_value {
        Some(ev) => info!("verify: earned value = {:.0}", ev),
        None => info!("verify: earned value = no data"),
    }
}
