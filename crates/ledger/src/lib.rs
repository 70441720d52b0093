pub mod store;

pub use store::TradeStore;

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::{info, warn};

use common::{
    Error, ExitReason, Result, Side, Signal, StrategyKind, StrategyPerformance, Trade,
    TradeStatistics, TradeStatus,
};

/// Result of a price-driven trade update.
#[derive(Debug, Clone)]
pub enum TradeUpdate {
    /// Still open; `last_update` was refreshed.
    Open(Trade),
    /// The price crossed the stop or target and the trade closed.
    Closed(Trade),
}

#[derive(Default)]
struct LedgerState {
    active: HashMap<String, Trade>,
    history: HashMap<String, Trade>,
}

/// Durable state machine for the trade lifecycle (OPEN → CLOSED).
///
/// All mutation happens under one write lock held across the matching
/// persistence write: concurrent update/close attempts on the same id
/// serialize, the second observing the post-state of the first. Closed
/// trades leave the active table in the same critical section that inserts
/// them into history, so an observer never sees a trade in both sets or
/// neither, and a second close is structurally impossible.
///
/// Persistence failures are logged and non-fatal; the in-memory state
/// stays authoritative for the running process and is rewritten on the
/// next mutation of the same record.
pub struct TradeLedger {
    state: RwLock<LedgerState>,
    store: TradeStore,
}

/// Signed percentage P/L for a filled round trip.
pub fn pnl_pct(side: Side, entry_price: f64, exit_price: f64) -> f64 {
    match side {
        Side::Buy => (exit_price - entry_price) / entry_price * 100.0,
        Side::Sell => (entry_price - exit_price) / entry_price * 100.0,
    }
}

impl TradeLedger {
    pub fn new(pool: SqlitePool) -> Self {
        TradeLedger {
            state: RwLock::new(LedgerState::default()),
            store: TradeStore::new(pool),
        }
    }

    /// Create tables if needed and reload both trade sets.
    pub async fn load(&self) -> Result<()> {
        self.store.init().await?;
        let (active, history) = self.store.load().await?;
        info!(
            active = active.len(),
            closed = history.len(),
            "Trade ledger loaded"
        );
        let mut state = self.state.write().await;
        state.active = active;
        state.history = history;
        Ok(())
    }

    /// Open a paper trade for an accepted signal.
    ///
    /// Returns `None` (logged, non-fatal) when an OPEN trade already exists
    /// for the same (asset, strategy, side). This is the system's only
    /// guard against duplicate positions.
    pub async fn open(&self, signal: &Signal) -> Option<Trade> {
        let trade = Trade::from_signal(signal);

        let mut state = self.state.write().await;
        let duplicate = state.active.values().any(|t| {
            t.asset == signal.asset && t.strategy == signal.strategy && t.side == signal.side
        });
        if duplicate {
            warn!(
                asset = %signal.asset,
                strategy = %signal.strategy,
                side = %signal.side,
                "Duplicate open rejected: an OPEN trade already exists"
            );
            return None;
        }

        state.active.insert(trade.id.clone(), trade.clone());
        if let Err(e) = self.store.save_active(&trade).await {
            warn!(
                trade_id = %trade.id,
                error = %e,
                "Failed to persist opened trade; in-memory state remains authoritative"
            );
        }
        info!(
            trade_id = %trade.id,
            side = %trade.side,
            entry_price = trade.entry_price,
            confidence = trade.confidence,
            "Trade opened"
        );
        Some(trade)
    }

    /// Evaluate the stop/target crossing for the trade's side and either
    /// close it or refresh its last-seen timestamp.
    ///
    /// An id not in the active set (including any already-closed trade) is
    /// a caller error and affects no other trade.
    pub async fn update(&self, trade_id: &str, current_price: f64) -> Result<TradeUpdate> {
        let mut state = self.state.write().await;

        let (side, stop_loss, take_profit) = {
            let trade = state
                .active
                .get(trade_id)
                .ok_or_else(|| Error::UnknownTrade(trade_id.to_string()))?;
            (trade.side, trade.stop_loss, trade.take_profit)
        };

        let crossed = match side {
            Side::Buy => {
                if current_price <= stop_loss {
                    Some(ExitReason::StopLoss)
                } else if current_price >= take_profit {
                    Some(ExitReason::TakeProfit)
                } else {
                    None
                }
            }
            Side::Sell => {
                if current_price >= stop_loss {
                    Some(ExitReason::StopLoss)
                } else if current_price <= take_profit {
                    Some(ExitReason::TakeProfit)
                } else {
                    None
                }
            }
        };

        if let Some(reason) = crossed {
            let closed = self
                .close_locked(&mut state, trade_id, current_price, reason)
                .await?;
            return Ok(TradeUpdate::Closed(closed));
        }

        let trade = state
            .active
            .get_mut(trade_id)
            .ok_or_else(|| Error::UnknownTrade(trade_id.to_string()))?;
        trade.last_update = Utc::now();
        let snapshot = trade.clone();
        if let Err(e) = self.store.save_active(&snapshot).await {
            warn!(trade_id, error = %e, "Failed to persist trade refresh");
        }
        Ok(TradeUpdate::Open(snapshot))
    }

    /// Close a trade explicitly (manual close or a crossing detected by
    /// `update`). CLOSED is terminal.
    pub async fn close(
        &self,
        trade_id: &str,
        exit_price: f64,
        reason: ExitReason,
    ) -> Result<Trade> {
        let mut state = self.state.write().await;
        self.close_locked(&mut state, trade_id, exit_price, reason).await
    }

    async fn close_locked(
        &self,
        state: &mut LedgerState,
        trade_id: &str,
        exit_price: f64,
        reason: ExitReason,
    ) -> Result<Trade> {
        let mut trade = state
            .active
            .remove(trade_id)
            .ok_or_else(|| Error::UnknownTrade(trade_id.to_string()))?;

        let now = Utc::now();
        let profit_loss_pct = pnl_pct(trade.side, trade.entry_price, exit_price);

        trade.status = TradeStatus::Closed;
        trade.exit_price = Some(exit_price);
        trade.exit_time = Some(now);
        trade.exit_reason = Some(reason);
        trade.profit_loss_pct = Some(profit_loss_pct);
        trade.duration_ms = Some((now - trade.entry_time).num_milliseconds());
        trade.success = Some(profit_loss_pct > 0.0);
        trade.last_update = now;

        state.history.insert(trade.id.clone(), trade.clone());

        if let Err(e) = self.store.save_closed(&trade).await {
            warn!(
                trade_id,
                error = %e,
                "Failed to persist trade close; in-memory state remains authoritative"
            );
        }
        info!(
            trade_id,
            exit_reason = %reason,
            profit_loss_pct,
            "Trade closed"
        );
        Ok(trade)
    }

    // ── Query views ───────────────────────────────────────────────────────

    pub async fn active_trades(&self, asset: Option<&str>) -> Vec<Trade> {
        let state = self.state.read().await;
        let mut trades: Vec<Trade> = state
            .active
            .values()
            .filter(|t| asset.is_none_or(|a| t.asset == a))
            .cloned()
            .collect();
        trades.sort_by_key(|t| t.entry_time);
        trades
    }

    /// Closed trades, most recent exit first, capped at `limit`.
    pub async fn history(&self, asset: Option<&str>, limit: usize) -> Vec<Trade> {
        let state = self.state.read().await;
        let mut trades: Vec<Trade> = state
            .history
            .values()
            .filter(|t| asset.is_none_or(|a| t.asset == a))
            .cloned()
            .collect();
        trades.sort_by(|a, b| b.exit_time.cmp(&a.exit_time));
        trades.truncate(limit);
        trades
    }

    pub async fn trade_by_id(&self, trade_id: &str) -> Option<Trade> {
        let state = self.state.read().await;
        state
            .active
            .get(trade_id)
            .or_else(|| state.history.get(trade_id))
            .cloned()
    }

    pub async fn open_trade_count(&self) -> usize {
        self.state.read().await.active.len()
    }

    pub async fn statistics(&self, asset: Option<&str>) -> TradeStatistics {
        let state = self.state.read().await;
        let trades: Vec<&Trade> = state
            .history
            .values()
            .filter(|t| asset.is_none_or(|a| t.asset == a))
            .collect();

        if trades.is_empty() {
            return TradeStatistics::default();
        }

        let total = trades.len();
        let winners = trades.iter().filter(|t| t.success == Some(true)).count();
        let total_pl: f64 = trades.iter().filter_map(|t| t.profit_loss_pct).sum();
        let total_duration: i64 = trades.iter().filter_map(|t| t.duration_ms).sum();

        let best = trades
            .iter()
            .max_by(|a, b| cmp_pl(a.profit_loss_pct, b.profit_loss_pct));
        let worst = trades
            .iter()
            .min_by(|a, b| cmp_pl(a.profit_loss_pct, b.profit_loss_pct));

        TradeStatistics {
            total_trades: total,
            winning_trades: winners,
            win_rate: winners as f64 / total as f64 * 100.0,
            total_profit_loss_pct: total_pl,
            average_profit_loss_pct: total_pl / total as f64,
            average_duration_ms: total_duration as f64 / total as f64,
            best_trade: best.map(|t| (*t).clone()),
            worst_trade: worst.map(|t| (*t).clone()),
        }
    }

    pub async fn strategy_performance(
        &self,
        asset: Option<&str>,
    ) -> HashMap<StrategyKind, StrategyPerformance> {
        let state = self.state.read().await;
        let mut rollup: HashMap<StrategyKind, StrategyPerformance> = HashMap::new();

        for trade in state
            .history
            .values()
            .filter(|t| asset.is_none_or(|a| t.asset == a))
        {
            let stats = rollup.entry(trade.strategy).or_default();
            stats.total_trades += 1;
            stats.total_profit_loss_pct += trade.profit_loss_pct.unwrap_or(0.0);
            if trade.success == Some(true) {
                stats.winning_trades += 1;
            }
        }

        for stats in rollup.values_mut() {
            stats.win_rate = stats.winning_trades as f64 / stats.total_trades as f64 * 100.0;
            stats.average_profit_loss_pct =
                stats.total_profit_loss_pct / stats.total_trades as f64;
        }
        rollup
    }
}

fn cmp_pl(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    a.unwrap_or(f64::MIN)
        .partial_cmp(&b.unwrap_or(f64::MIN))
        .unwrap_or(std::cmp::Ordering::Equal)
}
