/// Exponential moving average over the whole slice, seeded at the first
/// value with multiplier 2/(period+1). Returns 0.0 on empty input.
pub fn ema(values: &[f64], period: usize) -> f64 {
    if values.is_empty() || period == 0 {
        return 0.0;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[0];
    for &value in &values[1..] {
        ema = value * k + ema * (1.0 - k);
    }
    ema
}
