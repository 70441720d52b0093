/// Rolling support: lowest low over the trailing `window` bars.
/// Uses whatever is available when the slice is shorter; 0.0 on empty.
pub fn support(lows: &[f64], window: usize) -> f64 {
    let tail = trailing(lows, window);
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Rolling resistance: highest high over the trailing `window` bars.
pub fn resistance(highs: &[f64], window: usize) -> f64 {
    let tail = trailing(highs, window);
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Arithmetic mean of the trailing `window` volumes.
pub fn average_volume(volumes: &[f64], window: usize) -> f64 {
    let tail = trailing(volumes, window);
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}

fn trailing(values: &[f64], window: usize) -> &[f64] {
    &values[values.len().saturating_sub(window)..]
}
