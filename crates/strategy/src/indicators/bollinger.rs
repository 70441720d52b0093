/// Bollinger bands for the latest bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Simple moving average of the trailing `period` values.
/// Averages whatever is available when the slice is shorter; 0.0 on empty.
pub fn sma(values: &[f64], period: usize) -> f64 {
    if values.is_empty() || period == 0 {
        return 0.0;
    }
    let window = &values[values.len().saturating_sub(period)..];
    window.iter().sum::<f64>() / window.len() as f64
}

/// SMA(period) ± k · population standard deviation over the same window.
/// Returns all-zero bands with fewer than `period` closes.
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> BollingerBands {
    if closes.len() < period || period == 0 {
        return BollingerBands { upper: 0.0, middle: 0.0, lower: 0.0 };
    }

    let window = &closes[closes.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    BollingerBands {
        upper: mean + std_dev * k,
        middle: mean,
        lower: mean - std_dev * k,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_zero_with_insufficient_data() {
        let bands = bollinger(&[100.0; 10], 20, 2.0);
        assert_eq!(bands, BollingerBands { upper: 0.0, middle: 0.0, lower: 0.0 });
    }

    #[test]
    fn constant_series_collapses_bands_to_the_mean() {
        let bands = bollinger(&[50.0; 25], 20, 2.0);
        assert_eq!(bands.middle, 50.0);
        assert_eq!(bands.upper, 50.0);
        assert_eq!(bands.lower, 50.0);
    }

    #[test]
    fn bands_are_symmetric_around_the_mean() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 5) as f64).collect();
        let bands = bollinger(&closes, 20, 2.0);
        assert!(bands.upper > bands.middle && bands.middle > bands.lower);
        assert!(
            ((bands.upper - bands.middle) - (bands.middle - bands.lower)).abs() < 1e-9
        );
    }

    #[test]
    fn sma_uses_only_the_trailing_window() {
        let values = vec![0.0, 0.0, 0.0, 10.0, 20.0];
        assert!((sma(&values, 2) - 15.0).abs() < 1e-9);
    }
}
