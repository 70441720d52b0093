use chrono::Utc;

use common::{MultiTimeframeData, Side, Signal, StrategyKind, Timeframe};

use super::{closes, lows, volumes};
use crate::indicators::{average_volume, macd, rsi};
use crate::Evaluator;

const MIN_CANDLES: usize = 50;
const LOW_SEPARATION: usize = 10;
const LOW_MATCH_PCT: f64 = 0.02;
const BREAKOUT_PCT: f64 = 1.02;

/// Chart-pattern detection. Only the double bottom is implemented: two lows
/// within 2% of each other at least 10 bars apart, confirmed by the close
/// sitting at least 2% above the second low.
pub struct PatternEvaluator;

impl Evaluator for PatternEvaluator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ChartPattern
    }

    fn evaluate(&self, asset: &str, data: &MultiTimeframeData) -> Vec<Signal> {
        let candles = data.series(Timeframe::H1);
        if candles.len() < MIN_CANDLES {
            return Vec::new();
        }

        let lows = lows(candles);
        let closes = closes(candles);
        let volumes = volumes(candles);
        let current_price = closes[closes.len() - 1];

        for i in 20..lows.len().saturating_sub(LOW_SEPARATION) {
            let second_low = lows[i];
            let first_low = lows[i - LOW_SEPARATION];

            if (second_low - first_low).abs() / second_low >= LOW_MATCH_PCT {
                continue;
            }
            if current_price <= second_low * BREAKOUT_PCT {
                continue;
            }

            // Confirmed: emit the single pattern signal
            return vec![Signal {
                asset: asset.to_string(),
                strategy: StrategyKind::ChartPattern,
                pattern: Some("Double Bottom".to_string()),
                side: Side::Buy,
                price: current_price,
                stop_loss: second_low * 0.995,
                take_profit: current_price + (current_price - second_low),
                confidence: confidence(&closes, &volumes),
                risk: 0.03,
                created_at: Utc::now(),
                reason: "Double bottom pattern confirmed".to_string(),
            }];
        }

        Vec::new()
    }
}

fn confidence(closes: &[f64], volumes: &[f64]) -> f64 {
    let mut confidence: f64 = 70.0;

    // Reversal confluence: oversold momentum already turning up
    let rsi_value = rsi(closes, 14);
    let macd_value = macd(closes, 12, 26, 9);
    if rsi_value < 40.0 && macd_value.line > macd_value.signal {
        confidence += 10.0;
    }

    let volume = volumes[volumes.len() - 1];
    if volume > average_volume(volumes, 20) * 1.5 {
        confidence += 10.0;
    }

    confidence.min(95.0)
}
