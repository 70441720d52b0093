mod breakout;
mod fibonacci;
mod pattern;
mod range;
mod scalping;

pub use breakout::BreakoutEvaluator;
pub use fibonacci::FibonacciEvaluator;
pub use pattern::PatternEvaluator;
pub use range::RangeEvaluator;
pub use scalping::ScalpingEvaluator;

use common::Candle;

pub(crate) fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

pub(crate) fn highs(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.high).collect()
}

pub(crate) fn lows(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.low).collect()
}

pub(crate) fn volumes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.volume).collect()
}
