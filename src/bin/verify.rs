use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use evms_loader::{
    config::LoaderConfig,
    verify::{compute_metrics, log_summary, read_schema, verify},
    TABLE_NAME,
};
use rusqlite::{Connection, OpenFlags};
use std::{env, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Usage: evms-verify [DB_PATH] [CUTOFF_YYYY-MM-DD]
///
/// Column names and the cost overrun factor come from `EVMS_LOADER_CONFIG`
/// when set, otherwise from the built-in preset.
fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();

    let cfg = match env::var("EVMS_LOADER_CONFIG") {
        Ok(p) => {
            LoaderConfig::from_yaml_file(&p).with_context(|| format!("loading config {}", p))?
        }
        Err(_) => LoaderConfig::default(),
    };

    let mut args = env::args().skip(1);
    let db_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.destination_path.clone());
    let cutoff = match args.next() {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .with_context(|| format!("invalid cutoff date '{}'", s))?,
        None => Local::now().date_naive(),
    };

    if !db_path.is_file() {
        return Err(anyhow::anyhow!("database not found: {}", db_path.display()));
    }
    let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("opening {}", db_path.display()))?;

    // ─── 1) schema from the catalog ──────────────────────────────────
    let schema = read_schema(&conn, TABLE_NAME).context("reading table schema")?;
    info!("{}: {} columns", db_path.display(), schema.columns.len());

    // ─── 2) sanity aggregates ────────────────────────────────────────
    let summary = verify(&conn, &schema, &cfg.columns);
    log_summary(&summary);

    // ─── 3) EVMS indicators ──────────────────────────────────────────
    let m = compute_metrics(&conn, TABLE_NAME, &cfg.columns, cutoff, cfg.actual_cost_factor)
        .context("computing EVMS metrics")?;
    let fmt_idx =
        |v: Option<f64>| v.map_or_else(|| "no data".to_string(), |x| format!("{:.3}", x));

    println!("\n{: <12} {:>20}", "Metric", format!("as of {}", m.cutoff));
    println!("{:-<33}", "");
    for (name, value) in [
        ("BAC", m.bac),
        ("PV", m.pv),
        ("EV", m.ev),
        ("AC", m.ac),
        ("SV", m.sv),
        ("CV", m.cv),
        ("EAC", m.eac),
    ] {
        println!("{: <12} {:>20.0}", name, value);
    }
    println!("{: <12} {:>20}", "SPI", fmt_idx(m.spi));
    println!("{: <12} {:>20}", "CPI", fmt_idx(m.cpi));

    Ok(())
}
