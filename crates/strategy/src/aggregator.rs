use common::{MarketRegime, Side, Signal};

/// How aggressively candidate signals are admitted, derived from the
/// current market regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggression {
    /// Peak liquidity: full threshold and cap, no damping.
    Normal,
    /// Off-peak hours: higher bar, reduced confidence and risk.
    Conservative,
    /// High-volatility windows: highest bar, tightest sizing.
    VeryConservative,
}

impl Aggression {
    /// LowVol never reaches the aggregator; the orchestrator skips signal
    /// generation for that cycle entirely.
    pub fn for_regime(regime: MarketRegime) -> Self {
        match regime {
            MarketRegime::Peak => Aggression::Normal,
            MarketRegime::HighVol => Aggression::VeryConservative,
            MarketRegime::Normal | MarketRegime::LowVol => Aggression::Conservative,
        }
    }

    pub fn confidence_threshold(self) -> f64 {
        match self {
            Aggression::Normal => 70.0,
            Aggression::Conservative => 75.0,
            Aggression::VeryConservative => 80.0,
        }
    }

    pub fn max_signals(self) -> usize {
        match self {
            Aggression::Normal => 5,
            Aggression::Conservative => 3,
            Aggression::VeryConservative => 2,
        }
    }

    fn risk_ceiling(self) -> f64 {
        match self {
            Aggression::Normal => 0.04,
            Aggression::Conservative => 0.03,
            Aggression::VeryConservative => 0.02,
        }
    }
}

/// Merge evaluator candidates into the ranked signal list for one cycle:
/// damp for market conditions, gate on the confidence threshold, sort
/// descending by confidence, truncate to the mode's cap.
///
/// The sort is stable, so equal-confidence signals keep evaluator
/// declaration order (deterministic but arbitrary).
pub fn aggregate(candidates: Vec<Signal>, aggression: Aggression) -> Vec<Signal> {
    let threshold = aggression.confidence_threshold();

    let mut signals: Vec<Signal> = candidates
        .into_iter()
        .map(|signal| adjust(signal, aggression))
        .filter(|signal| signal.confidence >= threshold)
        .collect();

    signals.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    signals.truncate(aggression.max_signals());
    signals
}

/// Produce the market-condition-adjusted copy of one candidate.
fn adjust(signal: Signal, aggression: Aggression) -> Signal {
    let mut adjusted = signal.clone();

    match aggression {
        Aggression::Normal => {}
        Aggression::Conservative => {
            adjusted.confidence = (signal.confidence * 0.95).min(95.0);
            adjusted.risk = (signal.risk * 0.85).min(aggression.risk_ceiling());
        }
        Aggression::VeryConservative => {
            adjusted.confidence = (signal.confidence * 0.90).min(95.0);
            adjusted.risk = (signal.risk * 0.70).min(aggression.risk_ceiling());

            // Skew reward:risk toward safety: tighter stop, wider target
            let stop_distance = (signal.price - signal.stop_loss).abs();
            let target_distance = (signal.take_profit - signal.price).abs();
            match signal.side {
                Side::Buy => {
                    adjusted.stop_loss = signal.price - stop_distance * 0.8;
                    adjusted.take_profit = signal.price + target_distance * 1.2;
                }
                Side::Sell => {
                    adjusted.stop_loss = signal.price + stop_distance * 0.8;
                    adjusted.take_profit = signal.price - target_distance * 1.2;
                }
            }
        }
    }

    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::StrategyKind;

    fn signal(strategy: StrategyKind, confidence: f64) -> Signal {
        Signal {
            asset: "BTC".into(),
            strategy,
            pattern: None,
            side: Side::Buy,
            price: 100.0,
            stop_loss: 98.0,
            take_profit: 104.0,
            confidence,
            risk: 0.04,
            created_at: Utc::now(),
            reason: "test".into(),
        }
    }

    #[test]
    fn normal_mode_takes_top_five_at_threshold_seventy() {
        let confidences = [95.0, 90.0, 88.0, 85.0, 80.0, 75.0, 72.0, 70.0];
        let candidates: Vec<Signal> = confidences
            .iter()
            .map(|&c| signal(StrategyKind::Range, c))
            .collect();

        let ranked = aggregate(candidates, Aggression::Normal);

        assert_eq!(ranked.len(), 5);
        let got: Vec<f64> = ranked.iter().map(|s| s.confidence).collect();
        assert_eq!(got, vec![95.0, 90.0, 88.0, 85.0, 80.0]);
        assert!(ranked.iter().all(|s| s.confidence >= 70.0));
    }

    #[test]
    fn conservative_mode_damps_and_caps_at_three() {
        let candidates: Vec<Signal> = [90.0, 88.0, 86.0, 84.0, 82.0]
            .iter()
            .map(|&c| signal(StrategyKind::Breakout, c))
            .collect();

        let ranked = aggregate(candidates, Aggression::Conservative);

        assert_eq!(ranked.len(), 3);
        // 90 * 0.95 = 85.5, and everything below 75/0.95 is gone
        assert!((ranked[0].confidence - 85.5).abs() < 1e-9);
        assert!(ranked.iter().all(|s| s.confidence >= 75.0));
        assert!(ranked.iter().all(|s| (s.risk - 0.03).abs() < 1e-9));
    }

    #[test]
    fn very_conservative_skews_stops_and_targets() {
        let ranked = aggregate(vec![signal(StrategyKind::Range, 95.0)], Aggression::VeryConservative);
        assert_eq!(ranked.len(), 1);
        let s = &ranked[0];
        // Stop distance 2.0 * 0.8 = 1.6; target distance 4.0 * 1.2 = 4.8
        assert!((s.stop_loss - 98.4).abs() < 1e-9);
        assert!((s.take_profit - 104.8).abs() < 1e-9);
        assert!((s.confidence - 85.5).abs() < 1e-9);
        assert!((s.risk - 0.02).abs() < 1e-9);
    }

    #[test]
    fn threshold_drops_weak_signals_entirely() {
        let candidates = vec![signal(StrategyKind::Scalping, 69.9)];
        assert!(aggregate(candidates, Aggression::Normal).is_empty());
    }

    #[test]
    fn equal_confidence_keeps_declaration_order() {
        let candidates = vec![
            signal(StrategyKind::Range, 80.0),
            signal(StrategyKind::Scalping, 80.0),
            signal(StrategyKind::Breakout, 80.0),
        ];
        let ranked = aggregate(candidates, Aggression::Normal);
        let order: Vec<StrategyKind> = ranked.iter().map(|s| s.strategy).collect();
        assert_eq!(
            order,
            vec![StrategyKind::Range, StrategyKind::Scalping, StrategyKind::Breakout]
        );
    }
}
