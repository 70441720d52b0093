use common::Candle;

/// Volume-weighted average price over the whole window:
/// Σ(typical price · volume) / Σvolume, typical = (high + low + close) / 3.
/// Returns 0.0 when cumulative volume is zero.
pub fn vwap(candles: &[Candle]) -> f64 {
    let mut cumulative_tpv = 0.0;
    let mut cumulative_volume = 0.0;

    for candle in candles {
        let typical = (candle.high + candle.low + candle.close) / 3.0;
        cumulative_tpv += typical * candle.volume;
        cumulative_volume += candle.volume;
    }

    if cumulative_volume > 0.0 {
        cumulative_tpv / cumulative_volume
    } else {
        0.0
    }
}
