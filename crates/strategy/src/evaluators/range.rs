use chrono::Utc;

use common::{MultiTimeframeData, Side, Signal, StrategyKind, Timeframe};

use super::{closes, highs, lows};
use crate::indicators::{resistance, rsi, support};
use crate::Evaluator;

const MIN_CANDLES: usize = 20;
const LEVEL_WINDOW: usize = 10;
const MIN_RANGE_PCT: f64 = 2.0;

/// Mean reversion inside an established range: buy near support with
/// oversold RSI, sell near resistance with overbought RSI. Only fires when
/// the range spans at least 2% of price.
pub struct RangeEvaluator;

impl Evaluator for RangeEvaluator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Range
    }

    fn evaluate(&self, asset: &str, data: &MultiTimeframeData) -> Vec<Signal> {
        let candles = data.series(Timeframe::H1);
        if candles.len() < MIN_CANDLES {
            return Vec::new();
        }

        let closes = closes(candles);
        let current_price = closes[closes.len() - 1];

        let support_level = support(&lows(candles), LEVEL_WINDOW);
        let resistance_level = resistance(&highs(candles), LEVEL_WINDOW);
        let rsi_value = rsi(&closes, 14);

        let range_pct = (resistance_level - support_level) / current_price * 100.0;
        if range_pct < MIN_RANGE_PCT {
            return Vec::new();
        }

        let confidence = confidence(rsi_value, range_pct);
        let distance_to_support = (current_price - support_level) / current_price * 100.0;
        let distance_to_resistance = (resistance_level - current_price) / current_price * 100.0;

        let mut signals = Vec::new();

        if distance_to_support < 1.0 && rsi_value < 40.0 {
            signals.push(Signal {
                asset: asset.to_string(),
                strategy: StrategyKind::Range,
                pattern: None,
                side: Side::Buy,
                price: current_price,
                stop_loss: support_level * 0.995,
                take_profit: resistance_level * 0.995,
                confidence,
                risk: 0.03,
                created_at: Utc::now(),
                reason: "Price near support level with oversold RSI".to_string(),
            });
        }

        if distance_to_resistance < 1.0 && rsi_value > 60.0 {
            signals.push(Signal {
                asset: asset.to_string(),
                strategy: StrategyKind::Range,
                pattern: None,
                side: Side::Sell,
                price: current_price,
                stop_loss: resistance_level * 1.005,
                take_profit: support_level * 1.005,
                confidence,
                risk: 0.03,
                created_at: Utc::now(),
                reason: "Price near resistance level with overbought RSI".to_string(),
            });
        }

        signals
    }
}

fn confidence(rsi_value: f64, range_pct: f64) -> f64 {
    let mut confidence: f64 = 70.0;
    if rsi_value < 30.0 || rsi_value > 70.0 {
        confidence += 10.0;
    }
    if range_pct > 5.0 {
        confidence += 5.0;
    }
    confidence.min(95.0)
}
