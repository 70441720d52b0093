use tracing::{debug, info};

use common::{MultiTimeframeData, Signal};

use crate::evaluators::{
    BreakoutEvaluator, FibonacciEvaluator, PatternEvaluator, RangeEvaluator, ScalpingEvaluator,
};
use crate::Evaluator;

/// Owns the closed set of strategy evaluators, in fixed declaration order.
///
/// That order doubles as the aggregator's tie-break: equal-confidence
/// signals from earlier evaluators rank first.
pub struct StrategyRegistry {
    evaluators: Vec<Box<dyn Evaluator>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        let evaluators: Vec<Box<dyn Evaluator>> = vec![
            Box::new(RangeEvaluator),
            Box::new(ScalpingEvaluator),
            Box::new(BreakoutEvaluator),
            Box::new(FibonacciEvaluator),
            Box::new(PatternEvaluator),
        ];
        for evaluator in &evaluators {
            info!(strategy = %evaluator.kind(), "Registered strategy evaluator");
        }
        Self { evaluators }
    }

    /// Run every evaluator over one asset's data and collect the candidates.
    ///
    /// Evaluators are independent: one with missing or short data
    /// contributes nothing and cannot affect the others.
    pub fn evaluate_all(&self, asset: &str, data: &MultiTimeframeData) -> Vec<Signal> {
        let mut candidates = Vec::new();
        for evaluator in &self.evaluators {
            let signals = evaluator.evaluate(asset, data);
            debug!(
                asset,
                strategy = %evaluator.kind(),
                count = signals.len(),
                "Evaluator finished"
            );
            candidates.extend(signals);
        }
        candidates
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_data_yields_no_candidates() {
        let registry = StrategyRegistry::new();
        let candidates = registry.evaluate_all("BTC", &MultiTimeframeData::new());
        assert!(candidates.is_empty());
    }
}
