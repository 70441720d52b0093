use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{error, info, warn};

use common::{
    ExitReason, MarketDataProvider, MarketRegime, MultiTimeframeData, Quote, Result, Signal,
    StrategyKind, StrategyPerformance, Timeframe, Trade, TradeStatistics,
};
use ledger::{TradeLedger, TradeUpdate};
use optimizer::{AdaptiveOptimizer, OptimizerMetrics, StrategyRecommendation};
use strategy::{aggregate, Aggression, StrategyRegistry};

use crate::config::EngineConfig;
use crate::{regime, synthetic};

/// What the most recent analysis cycle saw for one asset.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSnapshot {
    pub timestamp: DateTime<Utc>,
    pub regime: MarketRegime,
    pub signals: Vec<Signal>,
    pub series_lens: HashMap<Timeframe, usize>,
}

/// Read model for dashboards: live positions plus the latest signal batch.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSignals {
    pub active_trades: Vec<Trade>,
    pub recent_signals: Vec<Signal>,
    pub last_update: Option<DateTime<Utc>>,
    pub regime: Option<MarketRegime>,
}

/// Aggregate per-asset view combining ledger, optimizer, and analysis state.
#[derive(Debug, Clone, Serialize)]
pub struct AssetOverview {
    pub asset: String,
    pub open_trades: usize,
    pub statistics: TradeStatistics,
    pub strategy_performance: HashMap<StrategyKind, StrategyPerformance>,
    pub recommendations: Vec<StrategyRecommendation>,
    pub last_analysis: Option<AnalysisSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetStatusSummary {
    pub timestamp: Option<DateTime<Utc>>,
    pub signal_count: usize,
    pub regime: Option<MarketRegime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub assets: Vec<String>,
    pub open_trades: usize,
    pub last_analysis: HashMap<String, AssetStatusSummary>,
    pub optimizer: OptimizerMetrics,
}

/// Ties per-asset analysis cycles to trade actions.
///
/// Per asset: fetch data (bounded, with fallback) → classify regime →
/// evaluators → aggregator → optimizer gate and sizing → open gate →
/// ledger, then push the latest price through every open trade and feed
/// each close back to the optimizer. A failure in one asset's cycle or one
/// evaluator never aborts another's.
pub struct Orchestrator {
    provider: Arc<dyn MarketDataProvider>,
    registry: StrategyRegistry,
    optimizer: Arc<AdaptiveOptimizer>,
    ledger: Arc<TradeLedger>,
    config: EngineConfig,
    last_analysis: RwLock<HashMap<String, AnalysisSnapshot>>,
    /// Last good fetch per asset, preferred over synthetic data on failure.
    data_cache: RwLock<HashMap<String, MultiTimeframeData>>,
    /// Last known live price per asset.
    quote_cache: RwLock<HashMap<String, Quote>>,
    /// Cycles for one asset never overlap; a busy asset's tick is skipped.
    cycle_guards: HashMap<String, Mutex<()>>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        optimizer: Arc<AdaptiveOptimizer>,
        ledger: Arc<TradeLedger>,
        config: EngineConfig,
    ) -> Self {
        let cycle_guards = config
            .assets
            .iter()
            .map(|asset| (asset.clone(), Mutex::new(())))
            .collect();

        Orchestrator {
            provider,
            registry: StrategyRegistry::new(),
            optimizer,
            ledger,
            config,
            last_analysis: RwLock::new(HashMap::new()),
            data_cache: RwLock::new(HashMap::new()),
            quote_cache: RwLock::new(HashMap::new()),
            cycle_guards,
        }
    }

    /// Spawn the three cadence loops: analysis, batch optimization, and
    /// live-price trade updates. Returns the task handles.
    pub fn spawn_cycles(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let orchestrator = Arc::clone(&self);
        handles.push(tokio::spawn(async move {
            let mut tick =
                tokio::time::interval(Duration::from_secs(orchestrator.config.analysis_interval_secs));
            loop {
                tick.tick().await;
                orchestrator.run_analysis_cycle().await;
            }
        }));

        let orchestrator = Arc::clone(&self);
        handles.push(tokio::spawn(async move {
            let mut tick =
                tokio::time::interval(Duration::from_secs(orchestrator.config.optimize_interval_secs));
            loop {
                tick.tick().await;
                orchestrator.optimizer.optimize().await;
            }
        }));

        let orchestrator = self;
        handles.push(tokio::spawn(async move {
            let mut tick =
                tokio::time::interval(Duration::from_secs(orchestrator.config.price_interval_secs));
            loop {
                tick.tick().await;
                orchestrator.run_price_cycle().await;
            }
        }));

        handles
    }

    /// One analysis pass over every configured asset.
    pub async fn run_analysis_cycle(&self) {
        info!("Running market analysis");
        for asset in &self.config.assets {
            self.analyze_asset(asset).await;
        }
        info!("Market analysis completed");
    }

    /// Push the latest price through every asset's open trades.
    pub async fn run_price_cycle(&self) {
        for asset in &self.config.assets {
            self.update_trades(asset).await;
        }
    }

    /// Analyze one asset under the current clock's regime.
    pub async fn analyze_asset(&self, asset: &str) {
        self.analyze_asset_at(asset, regime::classify(Utc::now())).await;
    }

    /// Analyze one asset under an explicit regime. The public entry point
    /// classifies from the clock; this split keeps cycles reproducible.
    pub async fn analyze_asset_at(&self, asset: &str, regime: MarketRegime) {
        let Some(guard) = self.cycle_guards.get(asset) else {
            warn!(asset, "Asset is not configured — skipping");
            return;
        };
        let Ok(_running) = guard.try_lock() else {
            warn!(asset, "Previous analysis cycle still running — skipping this tick");
            return;
        };

        if regime == MarketRegime::LowVol {
            info!(asset, "Low-volatility window — signal generation suppressed");
            self.record_snapshot(asset, regime, Vec::new(), &MultiTimeframeData::new())
                .await;
            self.update_trades(asset).await;
            return;
        }

        let data = self.fetch_with_fallback(asset).await;
        let candidates = self.registry.evaluate_all(asset, &data);
        let ranked = aggregate(candidates, Aggression::for_regime(regime));

        // Both gates must pass: the aggregator's confidence threshold above,
        // the optimizer's weight gate here.
        let mut accepted = Vec::new();
        for signal in ranked {
            if self
                .optimizer
                .should_generate_signal(asset, signal.strategy, regime)
                .await
            {
                accepted.push(self.optimizer.apply_sizing(&signal).await);
            } else {
                info!(
                    asset,
                    strategy = %signal.strategy,
                    confidence = signal.confidence,
                    "Signal suppressed by optimizer gate"
                );
            }
        }

        for signal in &accepted {
            let open_gate = (regime == MarketRegime::Peak || signal.confidence >= 85.0)
                && signal.confidence >= 70.0;
            if open_gate {
                self.ledger.open(signal).await;
            } else {
                info!(
                    asset,
                    strategy = %signal.strategy,
                    confidence = signal.confidence,
                    "Signal generated but trade not opened (outside peak hours)"
                );
            }
        }

        self.record_snapshot(asset, regime, accepted, &data).await;
        self.update_trades(asset).await;
    }

    /// Evaluate stop/target crossings for every open trade on the asset,
    /// forwarding each close to the optimizer.
    pub async fn update_trades(&self, asset: &str) {
        let Some(quote) = self.quote_with_fallback(asset).await else {
            warn!(asset, "No live price available — skipping trade updates");
            return;
        };

        for trade in self.ledger.active_trades(Some(asset)).await {
            match self.ledger.update(&trade.id, quote.price).await {
                Ok(TradeUpdate::Closed(closed)) => {
                    self.optimizer.record_outcome(&closed).await;
                }
                Ok(TradeUpdate::Open(_)) => {}
                Err(e) => {
                    error!(asset, trade_id = %trade.id, error = %e, "Trade update failed");
                }
            }
        }
    }

    /// Manual close. The outcome still feeds the optimizer.
    pub async fn force_close(&self, trade_id: &str, exit_price: f64) -> Result<Trade> {
        let closed = self
            .ledger
            .close(trade_id, exit_price, ExitReason::Manual)
            .await?;
        self.optimizer.record_outcome(&closed).await;
        Ok(closed)
    }

    // ── Data acquisition with bounded fallback ────────────────────────────

    async fn fetch_with_fallback(&self, asset: &str) -> MultiTimeframeData {
        let deadline = Duration::from_millis(self.config.fetch_timeout_ms);

        match timeout(deadline, self.provider.multi_timeframe(asset)).await {
            Ok(Ok(data)) if !data.is_empty() => {
                self.data_cache
                    .write()
                    .await
                    .insert(asset.to_string(), data.clone());
                data
            }
            Ok(Ok(_)) => {
                warn!(asset, "Provider returned no data — using fallback");
                self.cached_or_synthetic(asset).await
            }
            Ok(Err(e)) => {
                warn!(asset, error = %e, "Provider failed — using fallback");
                self.cached_or_synthetic(asset).await
            }
            Err(_) => {
                warn!(
                    asset,
                    timeout_ms = self.config.fetch_timeout_ms,
                    "Provider timed out — using fallback"
                );
                self.cached_or_synthetic(asset).await
            }
        }
    }

    async fn cached_or_synthetic(&self, asset: &str) -> MultiTimeframeData {
        if let Some(cached) = self.data_cache.read().await.get(asset) {
            return cached.clone();
        }
        synthetic::multi_timeframe(asset, 100)
    }

    async fn quote_with_fallback(&self, asset: &str) -> Option<Quote> {
        let deadline = Duration::from_millis(self.config.fetch_timeout_ms);

        match timeout(deadline, self.provider.real_time(asset)).await {
            Ok(Ok(quote)) => {
                self.quote_cache.write().await.insert(asset.to_string(), quote);
                Some(quote)
            }
            Ok(Err(e)) => {
                warn!(asset, error = %e, "Live price fetch failed — using last known");
                self.quote_cache.read().await.get(asset).copied()
            }
            Err(_) => {
                warn!(asset, "Live price fetch timed out — using last known");
                self.quote_cache.read().await.get(asset).copied()
            }
        }
    }

    async fn record_snapshot(
        &self,
        asset: &str,
        regime: MarketRegime,
        signals: Vec<Signal>,
        data: &MultiTimeframeData,
    ) {
        let series_lens = Timeframe::ALL
            .iter()
            .map(|&tf| (tf, data.len(tf)))
            .collect();
        let snapshot = AnalysisSnapshot {
            timestamp: Utc::now(),
            regime,
            signals,
            series_lens,
        };
        self.last_analysis
            .write()
            .await
            .insert(asset.to_string(), snapshot);
    }

    // ── Read models ───────────────────────────────────────────────────────

    pub async fn active_signals(&self, asset: &str) -> ActiveSignals {
        let last = self.last_analysis.read().await.get(asset).cloned();
        ActiveSignals {
            active_trades: self.ledger.active_trades(Some(asset)).await,
            recent_signals: last.as_ref().map(|s| s.signals.clone()).unwrap_or_default(),
            last_update: last.as_ref().map(|s| s.timestamp),
            regime: last.map(|s| s.regime),
        }
    }

    pub async fn trade_history(&self, asset: &str, limit: usize) -> Vec<Trade> {
        self.ledger.history(Some(asset), limit).await
    }

    pub async fn asset_overview(&self, asset: &str) -> AssetOverview {
        AssetOverview {
            asset: asset.to_string(),
            open_trades: self.ledger.active_trades(Some(asset)).await.len(),
            statistics: self.ledger.statistics(Some(asset)).await,
            strategy_performance: self.ledger.strategy_performance(Some(asset)).await,
            recommendations: self.optimizer.strategy_recommendations(asset).await,
            last_analysis: self.last_analysis.read().await.get(asset).cloned(),
        }
    }

    pub async fn system_status(&self) -> SystemStatus {
        let last_analysis = self.last_analysis.read().await;
        let summaries = self
            .config
            .assets
            .iter()
            .map(|asset| {
                let snapshot = last_analysis.get(asset);
                (
                    asset.clone(),
                    AssetStatusSummary {
                        timestamp: snapshot.map(|s| s.timestamp),
                        signal_count: snapshot.map(|s| s.signals.len()).unwrap_or(0),
                        regime: snapshot.map(|s| s.regime),
                    },
                )
            })
            .collect();
        drop(last_analysis);

        SystemStatus {
            assets: self.config.assets.clone(),
            open_trades: self.ledger.open_trade_count().await,
            last_analysis: summaries,
            optimizer: self.optimizer.performance_metrics().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use common::{Candle, Side};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Fixed multi-timeframe data plus an adjustable live price.
    struct MockProvider {
        data: MultiTimeframeData,
        price_cents: AtomicU64,
    }

    impl MockProvider {
        fn new(data: MultiTimeframeData, price: f64) -> Self {
            Self {
                data,
                price_cents: AtomicU64::new((price * 100.0) as u64),
            }
        }

        fn set_price(&self, price: f64) {
            self.price_cents.store((price * 100.0) as u64, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn multi_timeframe(&self, _asset: &str) -> Result<MultiTimeframeData> {
            Ok(self.data.clone())
        }

        async fn real_time(&self, _asset: &str) -> Result<Quote> {
            Ok(Quote {
                price: self.price_cents.load(Ordering::SeqCst) as f64 / 100.0,
                timestamp: Utc::now(),
            })
        }
    }

    /// 1h series with a 6% range, a clean support at 100, and a weak close
    /// streak ending ~0.8% above support: a high-conviction Range buy
    /// (base 70 + oversold RSI 10 + wide range 5 = 85).
    fn support_bounce_data() -> MultiTimeframeData {
        let start = Utc::now() - ChronoDuration::hours(41);
        let mut candles = Vec::new();
        for i in 0..40i64 {
            let base = if i < 25 { 106.0 } else { 106.0 - (i - 25) as f64 * 0.37 };
            let high = if i == 30 { 106.0 } else { base + 0.3 };
            let low = if i % 7 == 3 { 100.0 } else { base - 0.3 };
            candles.push(Candle {
                timestamp: start + ChronoDuration::hours(i),
                open: base + 0.1,
                high,
                low,
                close: base,
                volume: 1_000.0,
            });
        }
        let mut data = MultiTimeframeData::new();
        data.insert(Timeframe::H1, candles);
        data
    }

    async fn build(
        provider: Arc<MockProvider>,
    ) -> (Arc<Orchestrator>, Arc<TradeLedger>, Arc<AdaptiveOptimizer>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");

        let ledger = Arc::new(TradeLedger::new(pool.clone()));
        ledger.load().await.expect("ledger load");
        let optimizer = Arc::new(AdaptiveOptimizer::new(pool));
        optimizer.load().await.expect("optimizer load");

        let config = EngineConfig {
            assets: vec!["BTC".into()],
            ..EngineConfig::default()
        };
        let orchestrator = Arc::new(Orchestrator::new(
            provider,
            optimizer.clone(),
            ledger.clone(),
            config,
        ));
        (orchestrator, ledger, optimizer)
    }

    #[tokio::test]
    async fn support_bounce_flows_through_gates_into_a_trade() {
        let provider = Arc::new(MockProvider::new(support_bounce_data(), 101.0));
        let (orchestrator, ledger, _optimizer) = build(provider).await;

        orchestrator.analyze_asset_at("BTC", MarketRegime::Peak).await;

        assert_eq!(ledger.open_trade_count().await, 1);
        let trades = ledger.active_trades(Some("BTC")).await;
        assert_eq!(trades[0].strategy, StrategyKind::Range);
        assert_eq!(trades[0].side, Side::Buy);
        assert!(trades[0].confidence >= 70.0);

        let signals = orchestrator.active_signals("BTC").await;
        assert_eq!(signals.recent_signals.len(), 1);
        assert_eq!(signals.regime, Some(MarketRegime::Peak));
    }

    #[tokio::test]
    async fn range_signal_passes_optimizer_under_high_volatility() {
        // The §-level contract in one path: a clean support bounce yields a
        // Range BUY with confidence ≥ 70, the high-volatility multiplier
        // (1.0 × 1.3 > 0.8) admits it, and sizing leaves confidence at
        // min(original × weight, 95).
        let provider = Arc::new(MockProvider::new(support_bounce_data(), 101.0));
        let (orchestrator, _ledger, optimizer) = build(provider).await;

        let candidates = orchestrator
            .registry
            .evaluate_all("BTC", &support_bounce_data());
        let range_buy = candidates
            .iter()
            .find(|s| s.strategy == StrategyKind::Range && s.side == Side::Buy)
            .expect("range buy signal");
        assert!(range_buy.confidence >= 70.0);

        assert!(
            optimizer
                .should_generate_signal("BTC", StrategyKind::Range, MarketRegime::HighVol)
                .await
        );

        let sized = optimizer.apply_sizing(range_buy).await;
        let weight = optimizer.weight(StrategyKind::Range).await;
        assert!((sized.confidence - (range_buy.confidence * weight).min(95.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn off_peak_signal_is_suppressed_not_opened() {
        let provider = Arc::new(MockProvider::new(support_bounce_data(), 101.0));
        let (orchestrator, ledger, _optimizer) = build(provider).await;

        // Normal regime: conservative damping leaves confidence below the
        // 85 off-peak bar, so the signal is recorded but no trade opens
        orchestrator.analyze_asset_at("BTC", MarketRegime::Normal).await;

        assert_eq!(ledger.open_trade_count().await, 0);
        let signals = orchestrator.active_signals("BTC").await;
        assert_eq!(signals.recent_signals.len(), 1);
    }

    #[tokio::test]
    async fn low_volatility_updates_trades_but_generates_nothing() {
        let provider = Arc::new(MockProvider::new(support_bounce_data(), 101.0));
        let (orchestrator, ledger, optimizer) = build(provider.clone()).await;

        // Open a position first under peak conditions
        orchestrator.analyze_asset_at("BTC", MarketRegime::Peak).await;
        assert_eq!(ledger.open_trade_count().await, 1);

        // Price collapses through the stop during a low-vol cycle: no new
        // signals, but the existing trade still closes and feeds back
        provider.set_price(99.0);
        orchestrator.analyze_asset_at("BTC", MarketRegime::LowVol).await;

        assert_eq!(ledger.open_trade_count().await, 0);
        let history = ledger.history(Some("BTC"), 10).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].exit_reason, Some(ExitReason::StopLoss));

        let metrics = optimizer.performance_metrics().await;
        assert_eq!(metrics.total_records, 1);

        let signals = orchestrator.active_signals("BTC").await;
        assert!(signals.recent_signals.is_empty());
        assert_eq!(signals.regime, Some(MarketRegime::LowVol));
    }

    #[tokio::test]
    async fn force_close_feeds_the_optimizer() {
        let provider = Arc::new(MockProvider::new(support_bounce_data(), 101.0));
        let (orchestrator, ledger, optimizer) = build(provider).await;

        orchestrator.analyze_asset_at("BTC", MarketRegime::Peak).await;
        let trade = ledger.active_trades(Some("BTC")).await.remove(0);

        let closed = orchestrator.force_close(&trade.id, 103.0).await.unwrap();
        assert_eq!(closed.exit_reason, Some(ExitReason::Manual));
        assert_eq!(optimizer.performance_metrics().await.total_records, 1);

        // Terminal: a second manual close is an error
        assert!(orchestrator.force_close(&trade.id, 103.0).await.is_err());
    }

    #[tokio::test]
    async fn system_status_reflects_the_last_cycle() {
        let provider = Arc::new(MockProvider::new(support_bounce_data(), 101.0));
        let (orchestrator, _ledger, _optimizer) = build(provider).await;

        orchestrator.analyze_asset_at("BTC", MarketRegime::Peak).await;

        let status = orchestrator.system_status().await;
        assert_eq!(status.assets, vec!["BTC"]);
        assert_eq!(status.open_trades, 1);
        assert_eq!(status.last_analysis["BTC"].signal_count, 1);
        assert_eq!(status.last_analysis["BTC"].regime, Some(MarketRegime::Peak));

        let overview = orchestrator.asset_overview("BTC").await;
        assert_eq!(overview.open_trades, 1);
        assert!(overview.last_analysis.is_some());
    }
}
