use serde::{Deserialize, Serialize};

use common::StrategyKind;

/// Tunable parameter ranges for one strategy, nudged by batch optimization.
///
/// Each pair is `[lower, upper]`. The lower stop-loss / take-profit bounds
/// are the floors `apply_sizing` enforces on signal distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamRanges {
    pub rsi_oversold: [f64; 2],
    pub rsi_overbought: [f64; 2],
    pub stop_loss_pct: [f64; 2],
    pub take_profit_pct: [f64; 2],
}

impl Default for ParamRanges {
    fn default() -> Self {
        ParamRanges {
            rsi_oversold: [20.0, 40.0],
            rsi_overbought: [60.0, 80.0],
            stop_loss_pct: [0.5, 2.0],
            take_profit_pct: [1.0, 5.0],
        }
    }
}

impl ParamRanges {
    pub fn min_stop_loss_pct(&self) -> f64 {
        self.stop_loss_pct[0]
    }

    pub fn min_take_profit_pct(&self) -> f64 {
        self.take_profit_pct[0]
    }

    /// Widen the RSI bands: more setups qualify as extreme.
    pub fn nudge_aggressive(&mut self) {
        self.rsi_oversold[1] = (self.rsi_oversold[1] + 1.0).min(45.0);
        self.rsi_overbought[0] = (self.rsi_overbought[0] - 1.0).max(55.0);
    }

    /// Narrow the RSI bands: fewer setups qualify.
    pub fn nudge_conservative(&mut self) {
        self.rsi_oversold[1] = (self.rsi_oversold[1] - 1.0).max(35.0);
        self.rsi_overbought[0] = (self.rsi_overbought[0] + 1.0).min(65.0);
    }
}

/// Weight plus parameter ranges for one strategy. Weights live in
/// [0.5, 2.0]; hand-tuned priors reflect each strategy's historical edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyState {
    pub weight: f64,
    pub params: ParamRanges,
}

impl StrategyState {
    pub const MIN_WEIGHT: f64 = 0.5;
    pub const MAX_WEIGHT: f64 = 2.0;

    pub fn initial(kind: StrategyKind) -> Self {
        let weight = match kind {
            StrategyKind::Range => 1.0,
            StrategyKind::Scalping => 0.8,
            StrategyKind::Breakout => 1.2,
            StrategyKind::Fibonacci => 1.1,
            StrategyKind::ChartPattern => 1.3,
        };
        StrategyState { weight, params: ParamRanges::default() }
    }

    pub fn scale_weight(&mut self, factor: f64) {
        self.weight = (self.weight * factor).clamp(Self::MIN_WEIGHT, Self::MAX_WEIGHT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_scaling_is_clamped() {
        let mut state = StrategyState::initial(StrategyKind::ChartPattern);
        for _ in 0..20 {
            state.scale_weight(1.1);
        }
        assert_eq!(state.weight, StrategyState::MAX_WEIGHT);

        for _ in 0..40 {
            state.scale_weight(0.9);
        }
        assert_eq!(state.weight, StrategyState::MIN_WEIGHT);
    }

    #[test]
    fn aggressive_nudges_respect_caps() {
        let mut params = ParamRanges::default();
        for _ in 0..10 {
            params.nudge_aggressive();
        }
        assert_eq!(params.rsi_oversold[1], 45.0);
        assert_eq!(params.rsi_overbought[0], 55.0);
    }

    #[test]
    fn conservative_nudges_respect_floors() {
        let mut params = ParamRanges::default();
        for _ in 0..10 {
            params.nudge_conservative();
        }
        assert_eq!(params.rsi_oversold[1], 35.0);
        assert_eq!(params.rsi_overbought[0], 65.0);
    }
}
