pub mod config;
pub mod orchestrator;
pub mod regime;
pub mod synthetic;

pub use config::EngineConfig;
pub use orchestrator::{
    ActiveSignals, AnalysisSnapshot, AssetOverview, AssetStatusSummary, Orchestrator, SystemStatus,
};
pub use synthetic::SyntheticProvider;
