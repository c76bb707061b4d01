use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::Serialize;

use super::{progress_stats, ProgressStats};
use crate::config::MetricColumns;
use crate::schema::ddl::quote_ident;

/// Earned value indicators as of a cutoff date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvmsMetrics {
    pub cutoff: NaiveDate,
    pub bac: f64,
    pub pv: f64,
    pub ev: f64,
    pub ac: f64,
    pub sv: f64,
    pub cv: f64,
    /// `None` when PV is zero.
    pub spi: Option<f64>,
    /// `None` when AC is zero.
    pub cpi: Option<f64>,
    pub eac: f64,
    pub progress: Option<ProgressStats>,
}

/// Compute BAC/PV/EV/AC and the derived indices.
///
/// PV sums items whose finish date (compared as `YYYY-MM-DD` text) is on or
/// before `cutoff`. AC is estimated from progress times `actual_cost_factor`.
pub fn compute_metrics(
    conn: &Connection,
    table: &str,
    columns: &MetricColumns,
    cutoff: NaiveDate,
    actual_cost_factor: f64,
) -> rusqlite::Result<EvmsMetrics> {
    let t = quote_ident(table);
    let cost = quote_ident(&columns.total_cost);
    let p = quote_ident(&columns.progress);
    let fin = quote_ident(&columns.finish_date);
    let cutoff_str = cutoff.format("%Y-%m-%d").to_string();

    let bac: f64 = conn.query_row(
        &format!("SELECT COALESCE(SUM({cost}), 0) FROM {t}"),
        [],
        |r| r.get(0),
    )?;
    let pv: f64 = conn.query_row(
        &format!(
            "SELECT COALESCE(SUM({cost}), 0) FROM {t} \
             WHERE {fin} IS NOT NULL AND {fin} != '' AND {fin} <= ?1"
        ),
        params![cutoff_str],
        |r| r.get(0),
    )?;
    let ev: f64 = conn.query_row(
        &format!("SELECT COALESCE(SUM({cost} * COALESCE({p}, 0)), 0) FROM {t}"),
        [],
        |r| r.get(0),
    )?;
    let ac: f64 = conn.query_row(
        &format!(
            "SELECT COALESCE(SUM(CASE WHEN {p} IS NOT NULL AND {p} > 0 \
             THEN {cost} * {p} * ?1 ELSE 0 END), 0) FROM {t}"
        ),
        params![actual_cost_factor],
        |r| r.get(0),
    )?;

    let spi = ratio(ev, pv);
    let cpi = ratio(ev, ac);
    let eac = match cpi {
        Some(c) if c > 0.0 => bac / c,
        _ => bac,
    };

    Ok(EvmsMetrics {
        cutoff,
        bac,
        pv,
        ev,
        ac,
        sv: ev - pv,
        cv: ev - ac,
        spi,
        cpi,
        eac,
        progress: progress_stats(conn, &t, &p),
    })
}

fn ratio(num: f64, den: f64) -> Option<f64> {
    if den > 0.0 {
        Some(num / den)
    } else {
        None
    }
}
