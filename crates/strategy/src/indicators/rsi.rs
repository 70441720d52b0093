/// Relative Strength Index over the trailing `period` price deltas.
///
/// Average gain and loss are simple means of the last `period` changes.
/// Returns the neutral 50.0 when fewer than `period + 1` closes are
/// available, and 100.0 when the average loss is zero.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let change = closes[closes.len() - i] - closes[closes.len() - i - 1];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rsi_neutral_with_insufficient_data() {
        // Need at least period+1 = 15 values
        let prices = vec![100.0; 14];
        assert_eq!(rsi(&prices, 14), 50.0);
        assert_eq!(rsi(&[], 14), 50.0);
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&prices, 14), 100.0);
    }

    #[test]
    fn rsi_all_losses_near_zero() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64 * 0.5).collect();
        let value = rsi(&prices, 14);
        assert!(value.abs() < 1e-9, "Expected ~0, got {value}");
    }

    #[test]
    fn rsi_balanced_series_is_midrange() {
        // Alternating equal up/down moves → equal average gain and loss
        let mut prices = vec![100.0];
        for i in 0..14 {
            let last = *prices.last().unwrap();
            prices.push(if i % 2 == 0 { last + 1.0 } else { last - 1.0 });
        }
        let value = rsi(&prices, 14);
        assert!((value - 50.0).abs() < 1.0, "Expected ~50, got {value}");
    }

    proptest! {
        #[test]
        fn rsi_stays_in_range(closes in proptest::collection::vec(1.0f64..10_000.0, 0..60)) {
            let value = rsi(&closes, 14);
            prop_assert!((0.0..=100.0).contains(&value), "RSI out of range: {value}");
        }
    }
}
