//! Options Analytics Binary
//!
//! Runs the analytics core over a JSON snapshot and prints a JSON report.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin options-analytics -- snapshot.json
//! ```
//!
//! The snapshot holds an optional option chain, an IV history, the
//! portfolio and the user's alert rules. The report contains the volatility
//! surface, IV rank, portfolio Greeks, risk metrics and fired alerts.
//!
//! # Environment Variables
//!
//! - `OPTIONS_ANALYTICS_CONFIG`: YAML config path (default: `config.yaml` if present)
//! - `RUST_LOG`: Log filter (overrides `observability.logging.level`)

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use options_analytics::alerts::{Alert, AlertRule, AlertService};
use options_analytics::config::{Config, load_config};
use options_analytics::market::OptionChain;
use options_analytics::observability::init_logging;
use options_analytics::portfolio::{PortfolioContext, PortfolioGreeks, PortfolioSnapshot};
use options_analytics::risk::{PortfolioRiskMetrics, RiskMetricsCalculator};
use options_analytics::volatility::{
    IvPeriod, IvRankPercentile, SurfaceBuilder, VolatilitySurface, rank_percentile,
};

/// Environment variable naming the config file.
const CONFIG_ENV: &str = "OPTIONS_ANALYTICS_CONFIG";

/// Config file used when present and no override is set.
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// User id assigned to rules when the snapshot does not name one.
const DEFAULT_USER: &str = "default";

/// Snapshot errors.
#[derive(Debug, Error)]
enum SnapshotError {
    #[error("usage: options-analytics <snapshot.json>")]
    MissingPath,

    #[error("failed to read snapshot '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse snapshot '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Input snapshot.
#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    now: Option<DateTime<Utc>>,
    #[serde(default)]
    chain: Option<OptionChain>,
    #[serde(default)]
    iv_history: Vec<f64>,
    #[serde(default)]
    iv_period: IvPeriod,
    portfolio: PortfolioSnapshot,
    #[serde(default)]
    rules: Vec<AlertRule>,
}

/// Output report.
#[derive(Debug, Serialize)]
struct Report {
    generated_at: DateTime<Utc>,
    surface: Option<VolatilitySurface>,
    iv_rank: Option<IvRankPercentile>,
    greeks: PortfolioGreeks,
    risk: PortfolioRiskMetrics,
    alerts: Vec<Alert>,
}

fn main() -> anyhow::Result<()> {
    let config = resolve_config()?;
    init_logging(&config.observability.logging).context("failed to initialize logging")?;

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .ok_or(SnapshotError::MissingPath)?;
    let snapshot = read_snapshot(&path)?;

    tracing::info!(
        path = %path.display(),
        positions = snapshot.portfolio.positions.len(),
        rules = snapshot.rules.len(),
        "Loaded snapshot"
    );

    let report = analyze(&config, snapshot)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    tracing::info!(alerts = report.alerts.len(), "Analysis complete");
    Ok(())
}

/// Load config from the environment override, `config.yaml`, or defaults.
fn resolve_config() -> anyhow::Result<Config> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return load_config(Some(&path)).with_context(|| format!("loading {path}"));
    }
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return load_config(None).context("loading config.yaml");
    }
    Ok(Config::default())
}

fn read_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn analyze(config: &Config, snapshot: Snapshot) -> anyhow::Result<Report> {
    let now = snapshot.now.unwrap_or_else(Utc::now);
    let user_id = snapshot
        .user_id
        .unwrap_or_else(|| DEFAULT_USER.to_string());

    let surface = snapshot.chain.as_ref().map(|chain| {
        SurfaceBuilder::new(
            config.surface.clone(),
            config.pricing.clone(),
            config.iv_solver.clone(),
        )
        .build_chain(chain)
    });

    let iv_rank = surface
        .as_ref()
        .filter(|s| !s.is_empty())
        .map(|s| rank_percentile(s.atm_volatility, &snapshot.iv_history, snapshot.iv_period));

    let context = PortfolioContext::from_snapshot(snapshot.portfolio, &config.pricing);
    let risk = RiskMetricsCalculator::new(config.risk.clone()).calculate(&context);

    let service = AlertService::new(config.pricing.clone(), config.alerts.clone());
    for mut rule in snapshot.rules {
        rule.user_id.clone_from(&user_id);
        service
            .add_rule(rule)
            .context("registering alert rule")?;
    }
    let alerts = service.evaluate(&user_id, &context, now);

    Ok(Report {
        generated_at: now,
        surface,
        iv_rank,
        greeks: context.greeks,
        risk,
        alerts,
    })
}
