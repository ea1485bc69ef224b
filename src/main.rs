//! GRANARY — Harvest Timing Decision Engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores belief state from disk (or starts fresh), serves the decision
//! API, and autosaves snapshots until shutdown.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use granary::config;
use granary::dashboard::routes::{AppState, DashboardState};
use granary::dashboard::spawn_dashboard;
use granary::engine::DecisionEngine;
use granary::storage;

const BANNER: &str = r#"
  ____ ____      _    _   _    _    ______   __
 / ___|  _ \    / \  | \ | |  / \  |  _ \ \ / /
| |  _| |_) |  / _ \ |  \| | / _ \ | |_) \ V /
| |_| |  _ <  / ___ \| |\  |/ ___ \|  _ < | |
 \____|_| \_\/_/   \_\_| \_/_/   \_\_| \_\|_|

  Harvest Timing Decision Engine
  v0.1.0 — Thompson Sampling service
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        service_name = %cfg.service.name,
        state_file = %cfg.service.state_file,
        autosave_interval_secs = cfg.service.autosave_interval_secs,
        "GRANARY starting up"
    );

    // -- Restore or create engine ----------------------------------------

    let mut engine = DecisionEngine::new(cfg.engine_config())?;
    match storage::load_snapshot(Some(&cfg.service.state_file))? {
        Some(snapshot) => {
            let outcomes = snapshot.outcomes.len();
            engine.restore(snapshot)?;
            info!(outcomes, "Resumed from saved state");
        }
        None => {
            info!("Fresh start");
        }
    }

    let state: AppState = Arc::new(DashboardState::new(engine));

    // -- Dashboard --------------------------------------------------------

    if cfg.dashboard.enabled {
        spawn_dashboard(state.clone(), cfg.dashboard.port)?;
    }

    // -- Autosave loop -----------------------------------------------------

    let autosave = Duration::from_secs(cfg.service.autosave_interval_secs);
    let mut interval = tokio::time::interval(autosave);
    interval.tick().await; // first tick fires immediately; skip it
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.service.autosave_interval_secs,
        "Entering autosave loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let snapshot = state.engine.read().await.snapshot();
                if let Err(e) = storage::save_snapshot(&snapshot, Some(&cfg.service.state_file)) {
                    error!(error = %e, "Failed to save snapshot");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    // Save final state
    let engine = state.engine.read().await;
    storage::save_snapshot(&engine.snapshot(), Some(&cfg.service.state_file))?;
    let stats = engine.get_stats();
    info!(
        decisions = stats.total_decisions,
        resolved = stats.resolved,
        pending = stats.pending,
        "GRANARY shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("granary=info"));

    let json_logging = std::env::var("GRANARY_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
