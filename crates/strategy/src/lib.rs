pub mod aggregator;
pub mod evaluators;
pub mod indicators;
pub mod registry;

pub use aggregator::{aggregate, Aggression};
pub use registry::StrategyRegistry;

use common::{MultiTimeframeData, Signal, StrategyKind};

/// All strategy evaluators must satisfy this trait.
pub trait Evaluator: Send + Sync {
    /// Which strategy this evaluator implements.
    fn kind(&self) -> StrategyKind;

    /// Evaluate the asset's multi-timeframe data and emit candidate signals.
    ///
    /// A missing or too-short required series is a valid "no opinion"
    /// result (empty vec), never an error. Evaluators are pure: same data
    /// in, same candidates out.
    fn evaluate(&self, asset: &str, data: &MultiTimeframeData) -> Vec<Signal>;
}
