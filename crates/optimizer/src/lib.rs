pub mod params;
pub mod store;

pub use params::{ParamRanges, StrategyState};
pub use store::OptimizerStore;

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use common::{MarketRegime, PerformanceRecord, Result, Side, Signal, StrategyKind, Trade};

const MIN_SAMPLES: usize = 5;
const SIGNAL_GATE: f64 = 0.8;
const LOOKBACK_DAYS: i64 = 30;
const CONFIDENCE_CAP: f64 = 95.0;

/// Aggregate outcome metrics across every recorded trade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizerMetrics {
    pub total_records: usize,
    pub winning_records: usize,
    pub win_rate: f64,
    pub total_profit_loss_pct: f64,
    pub average_profit_loss_pct: f64,
}

/// Verdict attached to a per-asset strategy recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Recommended,
    Avoid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRecommendation {
    pub strategy: StrategyKind,
    pub win_rate: f64,
    pub average_profit_loss_pct: f64,
    pub total_trades: usize,
    pub verdict: Recommendation,
}

#[derive(Debug, Clone, Copy, Default)]
struct PerfStats {
    total: usize,
    wins: usize,
    total_pl: f64,
}

impl PerfStats {
    fn win_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.wins as f64 / self.total as f64 * 100.0
    }

    fn average_pl(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.total_pl / self.total as f64
    }
}

/// Learns per-strategy weights and parameter ranges from closed-trade
/// outcomes on two cadences: a fast, noisy per-trade nudge and a slow
/// 30-day batch recalibration. The dual-rate design trades responsiveness
/// against overfitting to single outcomes; the order of application is
/// significant and preserved (nudge at close time, batch on its own timer).
pub struct AdaptiveOptimizer {
    state: RwLock<HashMap<StrategyKind, StrategyState>>,
    records: RwLock<HashMap<String, PerformanceRecord>>,
    store: OptimizerStore,
}

impl AdaptiveOptimizer {
    pub fn new(pool: SqlitePool) -> Self {
        let state = StrategyKind::ALL
            .iter()
            .map(|&kind| (kind, StrategyState::initial(kind)))
            .collect();
        AdaptiveOptimizer {
            state: RwLock::new(state),
            records: RwLock::new(HashMap::new()),
            store: OptimizerStore::new(pool),
        }
    }

    /// Create tables if needed and overlay persisted state on the defaults.
    pub async fn load(&self) -> Result<()> {
        self.store.init().await?;

        let persisted = self.store.load_state().await?;
        let records = self.store.load_records().await?;
        info!(
            strategies = persisted.len(),
            records = records.len(),
            "Optimizer state loaded"
        );

        let mut state = self.state.write().await;
        for (kind, strategy_state) in persisted {
            state.insert(kind, strategy_state);
        }
        drop(state);

        *self.records.write().await = records;
        Ok(())
    }

    /// Append the trade's outcome and apply the fast weight nudge
    /// (×1.05 on profit, ×0.95 on loss, clamped to [0.5, 2.0]).
    pub async fn record_outcome(&self, trade: &Trade) {
        let Some(record) = PerformanceRecord::from_closed(trade) else {
            warn!(trade_id = %trade.id, "Outcome recording skipped: trade is not closed");
            return;
        };

        self.records
            .write()
            .await
            .insert(record.trade_id.clone(), record.clone());
        if let Err(e) = self.store.save_record(&record).await {
            warn!(
                trade_id = %record.trade_id,
                error = %e,
                "Failed to persist performance record; in-memory state remains authoritative"
            );
        }

        let factor = if record.success { 1.05 } else { 0.95 };
        let snapshot = {
            let mut state = self.state.write().await;
            let entry = state
                .entry(trade.strategy)
                .or_insert_with(|| StrategyState::initial(trade.strategy));
            entry.scale_weight(factor);
            entry.clone()
        };
        info!(
            strategy = %trade.strategy,
            trade_id = %trade.id,
            success = record.success,
            weight = snapshot.weight,
            "Strategy weight nudged"
        );

        if let Err(e) = self.store.save_state(trade.strategy, &snapshot).await {
            warn!(strategy = %trade.strategy, error = %e, "Failed to persist strategy state");
        }
    }

    /// Batch recalibration over the trailing 30-day window. Strategies with
    /// at least 5 samples get a ×1.1 weight bump and wider RSI bands when
    /// winning more than 60% with positive average P/L, or the opposite
    /// when winning less than 40% or losing on average.
    ///
    /// Parameter mutation is scoped to the strategy that earned it.
    pub async fn optimize(&self) {
        info!("Starting batch optimization");
        let cutoff = Utc::now() - Duration::days(LOOKBACK_DAYS);

        let per_strategy: HashMap<StrategyKind, PerfStats> = {
            let records = self.records.read().await;
            let mut map: HashMap<StrategyKind, PerfStats> = HashMap::new();
            for record in records.values().filter(|r| r.recorded_at > cutoff) {
                let stats = map.entry(record.strategy).or_default();
                stats.total += 1;
                stats.total_pl += record.profit_loss_pct;
                if record.success {
                    stats.wins += 1;
                }
            }
            map
        };

        let mut dirty = Vec::new();
        {
            let mut state = self.state.write().await;
            for (strategy, stats) in &per_strategy {
                if stats.total < MIN_SAMPLES {
                    debug!(
                        strategy = %strategy,
                        samples = stats.total,
                        "Skipping recalibration: not enough samples"
                    );
                    continue;
                }

                let entry = state
                    .entry(*strategy)
                    .or_insert_with(|| StrategyState::initial(*strategy));

                if stats.win_rate() > 60.0 && stats.average_pl() > 0.0 {
                    entry.scale_weight(1.1);
                    entry.params.nudge_aggressive();
                    info!(
                        strategy = %strategy,
                        win_rate = stats.win_rate(),
                        weight = entry.weight,
                        "Strategy promoted"
                    );
                    dirty.push((*strategy, entry.clone()));
                } else if stats.win_rate() < 40.0 || stats.average_pl() < 0.0 {
                    entry.scale_weight(0.9);
                    entry.params.nudge_conservative();
                    info!(
                        strategy = %strategy,
                        win_rate = stats.win_rate(),
                        weight = entry.weight,
                        "Strategy demoted"
                    );
                    dirty.push((*strategy, entry.clone()));
                }
            }
        }

        for (strategy, snapshot) in dirty {
            if let Err(e) = self.store.save_state(strategy, &snapshot).await {
                warn!(strategy = %strategy, error = %e, "Failed to persist strategy state");
            }
        }
        info!("Batch optimization completed");
    }

    /// Gate consulted before a signal may open a trade, independent of the
    /// aggregator's confidence threshold; both must pass. The strategy is
    /// permitted iff weight × regime multiplier exceeds 0.8.
    pub async fn should_generate_signal(
        &self,
        asset: &str,
        strategy: StrategyKind,
        regime: MarketRegime,
    ) -> bool {
        let weight = self.weight(strategy).await;
        let adjusted = weight * regime_multiplier(regime);
        let permitted = adjusted > SIGNAL_GATE;
        debug!(
            asset,
            strategy = %strategy,
            regime = %regime,
            weight,
            adjusted,
            permitted,
            "Signal gate evaluated"
        );
        permitted
    }

    /// Rescale a signal by the strategy weight (confidence cap 95) and
    /// floor its stop/target distances at the configured minimums. Never
    /// tightens a stop below the minimum stop-loss percentage or shrinks a
    /// target below the minimum take-profit percentage.
    pub async fn apply_sizing(&self, signal: &Signal) -> Signal {
        let state = self
            .state
            .read()
            .await
            .get(&signal.strategy)
            .cloned()
            .unwrap_or_else(|| StrategyState::initial(signal.strategy));

        let mut adjusted = signal.clone();
        adjusted.confidence = (signal.confidence * state.weight).min(CONFIDENCE_CAP);

        let min_stop = state.params.min_stop_loss_pct();
        let min_target = state.params.min_take_profit_pct();

        match signal.side {
            Side::Buy => {
                let stop_pct =
                    ((signal.price - signal.stop_loss) / signal.price * 100.0).max(min_stop);
                adjusted.stop_loss = signal.price * (1.0 - stop_pct / 100.0);

                let target_pct =
                    ((signal.take_profit - signal.price) / signal.price * 100.0).max(min_target);
                adjusted.take_profit = signal.price * (1.0 + target_pct / 100.0);
            }
            Side::Sell => {
                let stop_pct =
                    ((signal.stop_loss - signal.price) / signal.price * 100.0).max(min_stop);
                adjusted.stop_loss = signal.price * (1.0 + stop_pct / 100.0);

                let target_pct =
                    ((signal.price - signal.take_profit) / signal.price * 100.0).max(min_target);
                adjusted.take_profit = signal.price * (1.0 - target_pct / 100.0);
            }
        }

        adjusted
    }

    pub async fn weight(&self, strategy: StrategyKind) -> f64 {
        self.state
            .read()
            .await
            .get(&strategy)
            .map(|s| s.weight)
            .unwrap_or(1.0)
    }

    pub async fn param_ranges(&self, strategy: StrategyKind) -> ParamRanges {
        self.state
            .read()
            .await
            .get(&strategy)
            .map(|s| s.params.clone())
            .unwrap_or_default()
    }

    pub async fn performance_metrics(&self) -> OptimizerMetrics {
        let records = self.records.read().await;
        let total = records.len();
        let wins = records.values().filter(|r| r.success).count();
        let total_pl: f64 = records.values().map(|r| r.profit_loss_pct).sum();

        OptimizerMetrics {
            total_records: total,
            winning_records: wins,
            win_rate: if total > 0 { wins as f64 / total as f64 * 100.0 } else { 0.0 },
            total_profit_loss_pct: total_pl,
            average_profit_loss_pct: if total > 0 { total_pl / total as f64 } else { 0.0 },
        }
    }

    /// Per-strategy verdicts over one asset's records. Strategies with at
    /// least 3 samples are ranked by win rate; above 55% is RECOMMENDED.
    pub async fn strategy_recommendations(&self, asset: &str) -> Vec<StrategyRecommendation> {
        let per_strategy: HashMap<StrategyKind, PerfStats> = {
            let records = self.records.read().await;
            let mut map: HashMap<StrategyKind, PerfStats> = HashMap::new();
            for record in records.values().filter(|r| r.asset == asset) {
                let stats = map.entry(record.strategy).or_default();
                stats.total += 1;
                stats.total_pl += record.profit_loss_pct;
                if record.success {
                    stats.wins += 1;
                }
            }
            map
        };

        let mut recommendations: Vec<StrategyRecommendation> = per_strategy
            .into_iter()
            .filter(|(_, stats)| stats.total >= 3)
            .map(|(strategy, stats)| StrategyRecommendation {
                strategy,
                win_rate: stats.win_rate(),
                average_profit_loss_pct: stats.average_pl(),
                total_trades: stats.total,
                verdict: if stats.win_rate() > 55.0 {
                    Recommendation::Recommended
                } else {
                    Recommendation::Avoid
                },
            })
            .collect();

        recommendations.sort_by(|a, b| {
            b.win_rate
                .partial_cmp(&a.win_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        recommendations
    }
}

fn regime_multiplier(regime: MarketRegime) -> f64 {
    match regime {
        MarketRegime::Peak => 1.2,
        MarketRegime::LowVol => 0.7,
        MarketRegime::HighVol => 1.3,
        MarketRegime::Normal => 1.0,
    }
}
