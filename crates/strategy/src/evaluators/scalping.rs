use chrono::Utc;

use common::{MultiTimeframeData, Side, Signal, StrategyKind, Timeframe};

use super::{closes, volumes};
use crate::indicators::{average_volume, macd, rsi, Macd};
use crate::Evaluator;

const MIN_CANDLES: usize = 20;
const VOLUME_WINDOW: usize = 20;

/// Short-horizon reversals on the 15-minute series: an RSI extreme
/// confirmed by MACD momentum in the same direction and a volume spike.
/// Stops and targets are tight (0.5% / 1%).
pub struct ScalpingEvaluator;

impl Evaluator for ScalpingEvaluator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Scalping
    }

    fn evaluate(&self, asset: &str, data: &MultiTimeframeData) -> Vec<Signal> {
        let candles = data.series(Timeframe::M15);
        if candles.len() < MIN_CANDLES {
            return Vec::new();
        }

        let closes = closes(candles);
        let volumes = volumes(candles);
        let current_price = closes[closes.len() - 1];

        let rsi_value = rsi(&closes, 14);
        let macd_value = macd(&closes, 12, 26, 9);
        let volume = volumes[volumes.len() - 1];
        let avg_volume = average_volume(&volumes, VOLUME_WINDOW);

        let volume_spike = volume > avg_volume * 1.5;
        let macd_bullish = macd_value.line > macd_value.signal && macd_value.line > 0.0;
        let macd_bearish = macd_value.line < macd_value.signal && macd_value.line < 0.0;

        let confidence = confidence(rsi_value, &macd_value, volume, avg_volume);
        let mut signals = Vec::new();

        if rsi_value < 30.0 && macd_bullish && volume_spike {
            signals.push(Signal {
                asset: asset.to_string(),
                strategy: StrategyKind::Scalping,
                pattern: None,
                side: Side::Buy,
                price: current_price,
                stop_loss: current_price * 0.995,
                take_profit: current_price * 1.01,
                confidence,
                risk: 0.02,
                created_at: Utc::now(),
                reason: "Oversold RSI with bullish MACD and volume spike".to_string(),
            });
        }

        if rsi_value > 70.0 && macd_bearish && volume_spike {
            signals.push(Signal {
                asset: asset.to_string(),
                strategy: StrategyKind::Scalping,
                pattern: None,
                side: Side::Sell,
                price: current_price,
                stop_loss: current_price * 1.005,
                take_profit: current_price * 0.99,
                confidence,
                risk: 0.02,
                created_at: Utc::now(),
                reason: "Overbought RSI with bearish MACD and volume spike".to_string(),
            });
        }

        signals
    }
}

fn confidence(rsi_value: f64, macd_value: &Macd, volume: f64, avg_volume: f64) -> f64 {
    let mut confidence: f64 = 65.0;
    if volume > avg_volume * 2.0 {
        confidence += 10.0;
    }
    if rsi_value < 25.0 || rsi_value > 75.0 {
        confidence += 10.0;
    }
    if macd_value.line.abs() > macd_value.signal.abs() {
        confidence += 5.0;
    }
    confidence.min(95.0)
}
