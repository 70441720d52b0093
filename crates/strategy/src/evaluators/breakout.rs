use chrono::Utc;

use common::{MultiTimeframeData, Side, Signal, StrategyKind, Timeframe};

use super::{closes, highs, lows, volumes};
use crate::indicators::{average_volume, bollinger, resistance, support, BollingerBands};
use crate::Evaluator;

const MIN_CANDLES: usize = 50;
const LEVEL_WINDOW: usize = 20;
const VOLUME_WINDOW: usize = 20;

/// Momentum continuation: price clearing the prior 20-bar high/low or the
/// upper Bollinger band on a ≥2x volume spike. Targets are a measured-move
/// projection of the breakout distance.
pub struct BreakoutEvaluator;

enum BreakoutKind {
    Level,
    Band,
}

impl Evaluator for BreakoutEvaluator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Breakout
    }

    fn evaluate(&self, asset: &str, data: &MultiTimeframeData) -> Vec<Signal> {
        let candles = data.series(Timeframe::H1);
        if candles.len() < MIN_CANDLES {
            return Vec::new();
        }

        let closes = closes(candles);
        let volumes = volumes(candles);
        let current_price = closes[closes.len() - 1];

        // Levels come from the bars *before* the current one; a close can
        // never clear a window that contains its own bar's high.
        let prior = &candles[..candles.len() - 1];
        let support_level = support(&lows(prior), LEVEL_WINDOW);
        let resistance_level = resistance(&highs(prior), LEVEL_WINDOW);
        let volume = volumes[volumes.len() - 1];
        let avg_volume = average_volume(&volumes, VOLUME_WINDOW);
        let bands = bollinger(&closes, 20, 2.0);

        let volume_spike = volume > avg_volume * 2.0;
        if !volume_spike {
            return Vec::new();
        }

        let range_pct = (resistance_level - support_level) / current_price * 100.0;
        let mut signals = Vec::new();

        if current_price > resistance_level {
            signals.push(Signal {
                asset: asset.to_string(),
                strategy: StrategyKind::Breakout,
                pattern: None,
                side: Side::Buy,
                price: current_price,
                stop_loss: resistance_level * 0.995,
                take_profit: current_price + (current_price - resistance_level),
                confidence: confidence(
                    BreakoutKind::Level,
                    volume,
                    avg_volume,
                    range_pct,
                    &bands,
                    current_price,
                ),
                risk: 0.04,
                created_at: Utc::now(),
                reason: "Breakout above resistance with high volume".to_string(),
            });
        }

        if current_price < support_level {
            signals.push(Signal {
                asset: asset.to_string(),
                strategy: StrategyKind::Breakout,
                pattern: None,
                side: Side::Sell,
                price: current_price,
                stop_loss: support_level * 1.005,
                take_profit: current_price - (support_level - current_price),
                confidence: confidence(
                    BreakoutKind::Level,
                    volume,
                    avg_volume,
                    range_pct,
                    &bands,
                    current_price,
                ),
                risk: 0.04,
                created_at: Utc::now(),
                reason: "Breakdown below support with high volume".to_string(),
            });
        }

        if current_price > bands.upper && bands.upper > 0.0 {
            signals.push(Signal {
                asset: asset.to_string(),
                strategy: StrategyKind::Breakout,
                pattern: None,
                side: Side::Buy,
                price: current_price,
                stop_loss: bands.middle,
                take_profit: current_price + (bands.upper - bands.middle),
                confidence: confidence(
                    BreakoutKind::Band,
                    volume,
                    avg_volume,
                    range_pct,
                    &bands,
                    current_price,
                ),
                risk: 0.03,
                created_at: Utc::now(),
                reason: "Breakout above upper Bollinger Band with high volume".to_string(),
            });
        }

        signals
    }
}

fn confidence(
    kind: BreakoutKind,
    volume: f64,
    avg_volume: f64,
    range_pct: f64,
    bands: &BollingerBands,
    current_price: f64,
) -> f64 {
    let mut confidence: f64 = 70.0;

    if volume > avg_volume * 3.0 {
        confidence += 15.0;
    } else if volume > avg_volume * 2.0 {
        confidence += 10.0;
    }

    match kind {
        BreakoutKind::Level => {
            if range_pct > 5.0 {
                confidence += 10.0;
            } else if range_pct > 3.0 {
                confidence += 5.0;
            }
        }
        BreakoutKind::Band => {
            let band_pct = (bands.upper - bands.lower) / current_price * 100.0;
            if band_pct > 4.0 {
                confidence += 10.0;
            }
        }
    }

    confidence.min(95.0)
}
