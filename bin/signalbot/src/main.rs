use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::Config;
use engine::{EngineConfig, Orchestrator, SyntheticProvider};
use ledger::TradeLedger;
use optimizer::AdaptiveOptimizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let engine_cfg = EngineConfig::load(&cfg.engine_config_path);
    info!(assets = ?engine_cfg.assets, "Signalbot starting");

    // ── Database ──────────────────────────────────────────────────────────────
    let db = SqlitePoolOptions::new().connect(&cfg.database_url).await?;
    info!("Database ready");

    // ── Persistent state ──────────────────────────────────────────────────────
    let ledger = Arc::new(TradeLedger::new(db.clone()));
    ledger.load().await?;

    let optimizer = Arc::new(AdaptiveOptimizer::new(db));
    optimizer.load().await?;

    // ── Market data ───────────────────────────────────────────────────────────
    // Live ingestion is an external collaborator; standalone runs analyze
    // synthetic candles so every cycle still completes end to end.
    let provider = Arc::new(SyntheticProvider::new());

    // ── Orchestrator ──────────────────────────────────────────────────────────
    let orchestrator = Arc::new(Orchestrator::new(provider, optimizer, ledger, engine_cfg));
    let handles = orchestrator.spawn_cycles();

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting.");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}
