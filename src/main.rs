use anyhow::{Context, Result};
use evms_loader::{run, LoaderConfig};
use std::{env, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const CONFIG_ENV: &str = "EVMS_LOADER_CONFIG";

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) resolve config: argv, then env, then the built-in preset ─
    let config_path: Option<PathBuf> = env::args()
        .nth(1)
        .or_else(|| env::var(CONFIG_ENV).ok())
        .map(PathBuf::from);
    let cfg = match &config_path {
        Some(p) => LoaderConfig::from_yaml_file(p)
            .with_context(|| format!("loading config {}", p.display()))?,
        None => LoaderConfig::default(),
    };
    info!(
        "source {} → {}",
        cfg.source_path.display(),
        cfg.destination_path.display()
    );

    // ─── 3) build ────────────────────────────────────────────────────
    let summary = run(&cfg).context("load failed")?;

    if let Some(backup) = &summary.backup {
        info!("backup {}", backup.destination.display());
    }
    info!(
        "DONE! Rows={} Total={:.0}",
        summary.primary.rows, summary.primary.total_cost
    );
    Ok(())
}
