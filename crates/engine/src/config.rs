use serde::Deserialize;
use tracing::info;

/// Orchestrator configuration (TOML file).
///
/// Example `config/signalbot.toml`:
/// ```toml
/// assets = ["BTC", "ETH", "SOL"]
/// analysis_interval_secs = 300
/// optimize_interval_secs = 3600
/// price_interval_secs = 5
/// fetch_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Assets analyzed each cycle.
    pub assets: Vec<String>,
    /// Cadence of the per-asset analysis cycle.
    pub analysis_interval_secs: u64,
    /// Cadence of batch optimization, independent of trade cycles.
    pub optimize_interval_secs: u64,
    /// Cadence of live-price trade updates.
    pub price_interval_secs: u64,
    /// Bound on any single market-data fetch.
    pub fetch_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            assets: vec!["BTC".into(), "ETH".into(), "SOL".into()],
            analysis_interval_secs: 300,
            optimize_interval_secs: 3600,
            price_interval_secs: 5,
            fetch_timeout_ms: 5000,
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file. A missing file means defaults; a file that
    /// exists but does not parse exits the process.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                panic!("Failed to parse engine config at '{path}': {e}")
            }),
            Err(_) => {
                info!(path, "No engine config file found — using defaults");
                EngineConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_three_assets() {
        let config = EngineConfig::default();
        assert_eq!(config.assets, vec!["BTC", "ETH", "SOL"]);
        assert_eq!(config.analysis_interval_secs, 300);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: EngineConfig = toml::from_str("assets = [\"BTC\"]").unwrap();
        assert_eq!(config.assets, vec!["BTC"]);
        assert_eq!(config.optimize_interval_secs, 3600);
    }
}
