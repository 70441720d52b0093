use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV candle. Series are ordered ascending by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle resolution used by the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::M15, Timeframe::H1, Timeframe::H4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
        }
    }

    pub fn duration_ms(&self) -> i64 {
        match self {
            Timeframe::M15 => 15 * 60 * 1000,
            Timeframe::H1 => 60 * 60 * 1000,
            Timeframe::H4 => 4 * 60 * 60 * 1000,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candle series per timeframe for one asset.
///
/// A timeframe the provider could not deliver is simply absent; `series`
/// returns an empty slice for it, which evaluators treat as "no opinion".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiTimeframeData {
    series: HashMap<Timeframe, Vec<Candle>>,
}

impl MultiTimeframeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timeframe: Timeframe, candles: Vec<Candle>) {
        self.series.insert(timeframe, candles);
    }

    pub fn series(&self, timeframe: Timeframe) -> &[Candle] {
        self.series.get(&timeframe).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self, timeframe: Timeframe) -> usize {
        self.series(timeframe).len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }
}

/// Latest live price for an asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Side of a signal or trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(format!("unknown side '{other}'")),
        }
    }
}

/// The closed set of strategies the system runs.
///
/// Display names match the identifiers used in persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    #[serde(rename = "Range Trading")]
    Range,
    #[serde(rename = "Scalping")]
    Scalping,
    #[serde(rename = "Breakout Trading")]
    Breakout,
    #[serde(rename = "Fibonacci Trading")]
    Fibonacci,
    #[serde(rename = "Chart Pattern")]
    ChartPattern,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Range,
        StrategyKind::Scalping,
        StrategyKind::Breakout,
        StrategyKind::Fibonacci,
        StrategyKind::ChartPattern,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Range => "Range Trading",
            StrategyKind::Scalping => "Scalping",
            StrategyKind::Breakout => "Breakout Trading",
            StrategyKind::Fibonacci => "Fibonacci Trading",
            StrategyKind::ChartPattern => "Chart Pattern",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Range Trading" => Ok(StrategyKind::Range),
            "Scalping" => Ok(StrategyKind::Scalping),
            "Breakout Trading" => Ok(StrategyKind::Breakout),
            "Fibonacci Trading" => Ok(StrategyKind::Fibonacci),
            "Chart Pattern" => Ok(StrategyKind::ChartPattern),
            other => Err(format!("unknown strategy '{other}'")),
        }
    }
}

/// Market timing classification governing how aggressively signals are
/// generated. `LowVol` suppresses analysis entirely for the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketRegime {
    Normal,
    Peak,
    LowVol,
    HighVol,
}

impl std::fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketRegime::Normal => write!(f, "NORMAL"),
            MarketRegime::Peak => write!(f, "PEAK"),
            MarketRegime::LowVol => write!(f, "LOW_VOL"),
            MarketRegime::HighVol => write!(f, "HIGH_VOL"),
        }
    }
}

/// A candidate trade produced by a strategy evaluator.
///
/// Signals are immutable: the aggregator and optimizer return adjusted
/// copies rather than mutating in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub asset: String,
    pub strategy: StrategyKind,
    /// Pattern name for chart-pattern signals (e.g. "Double Bottom").
    pub pattern: Option<String>,
    pub side: Side,
    /// Reference price at signal time, used as the entry price.
    pub price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Heuristic conviction score in [0, 100], not a calibrated probability.
    pub confidence: f64,
    /// Fraction of capital the signal suggests putting at risk.
    pub risk: f64,
    pub created_at: DateTime<Utc>,
    pub reason: String,
}

/// Lifecycle state of a trade. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Why a trade left the OPEN state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Manual,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "STOP_LOSS"),
            ExitReason::TakeProfit => write!(f, "TAKE_PROFIT"),
            ExitReason::Manual => write!(f, "MANUAL"),
        }
    }
}

/// A paper position tracked by the ledger.
///
/// Owned exclusively by the Trade Ledger; at most one OPEN trade exists per
/// (asset, strategy, side) tuple at any time. Once CLOSED the record is
/// immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub asset: String,
    pub strategy: StrategyKind,
    pub side: Side,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub entry_time: DateTime<Utc>,
    pub confidence: f64,
    pub reason: String,
    pub pattern: Option<String>,
    pub status: TradeStatus,
    pub last_update: DateTime<Utc>,
    pub exit_price: Option<f64>,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_reason: Option<ExitReason>,
    pub profit_loss_pct: Option<f64>,
    pub duration_ms: Option<i64>,
    pub success: Option<bool>,
}

impl Trade {
    /// Deterministic trade id: the same signal always maps to the same id.
    pub fn id_for(signal: &Signal) -> String {
        format!(
            "{}_{}_{}",
            signal.asset,
            signal.strategy,
            signal.created_at.timestamp_millis()
        )
    }

    pub fn from_signal(signal: &Signal) -> Self {
        Trade {
            id: Trade::id_for(signal),
            asset: signal.asset.clone(),
            strategy: signal.strategy,
            side: signal.side,
            entry_price: signal.price,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            entry_time: signal.created_at,
            confidence: signal.confidence,
            reason: signal.reason.clone(),
            pattern: signal.pattern.clone(),
            status: TradeStatus::Open,
            last_update: signal.created_at,
            exit_price: None,
            exit_time: None,
            exit_reason: None,
            profit_loss_pct: None,
            duration_ms: None,
            success: None,
        }
    }
}

/// Snapshot of a trade's outcome, appended once per closed trade and keyed
/// by trade id. Source of truth for optimizer learning and reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub trade_id: String,
    pub asset: String,
    pub strategy: StrategyKind,
    pub side: Side,
    pub confidence: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub exit_time: DateTime<Utc>,
    pub profit_loss_pct: f64,
    pub success: bool,
    pub recorded_at: DateTime<Utc>,
}

impl PerformanceRecord {
    /// Build a record from a closed trade. Returns `None` while the trade
    /// is still open.
    pub fn from_closed(trade: &Trade) -> Option<Self> {
        Some(PerformanceRecord {
            trade_id: trade.id.clone(),
            asset: trade.asset.clone(),
            strategy: trade.strategy,
            side: trade.side,
            confidence: trade.confidence,
            entry_price: trade.entry_price,
            exit_price: trade.exit_price?,
            exit_time: trade.exit_time?,
            profit_loss_pct: trade.profit_loss_pct?,
            success: trade.success?,
            recorded_at: Utc::now(),
        })
    }
}

/// Aggregate view over a set of closed trades.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeStatistics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub win_rate: f64,
    pub total_profit_loss_pct: f64,
    pub average_profit_loss_pct: f64,
    pub average_duration_ms: f64,
    pub best_trade: Option<Trade>,
    pub worst_trade: Option<Trade>,
}

/// Per-strategy rollup of closed-trade outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyPerformance {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub win_rate: f64,
    pub total_profit_loss_pct: f64,
    pub average_profit_loss_pct: f64,
}
