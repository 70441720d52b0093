use super::ema::ema;

/// The three MACD components for the latest bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl Macd {
    const ZERO: Macd = Macd { line: 0.0, signal: 0.0, histogram: 0.0 };
}

/// MACD line = EMA(fast) − EMA(slow); the signal line is the EMA of the
/// per-bar MACD series built from index `slow` onward.
///
/// Returns an all-zero (neutral) result with fewer than `slow + signal`
/// closes. Quadratic in the window length; analysis windows are ≤100 bars.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    if closes.len() < slow + signal {
        return Macd::ZERO;
    }

    let line = ema(closes, fast) - ema(closes, slow);

    let series: Vec<f64> = (slow..closes.len())
        .map(|i| ema(&closes[..=i], fast) - ema(&closes[..=i], slow))
        .collect();
    let signal_line = ema(&series, signal);

    Macd {
        line,
        signal: signal_line,
        histogram: line - signal_line,
    }
}
