use async_trait::async_trait;

use crate::{MultiTimeframeData, Quote, Result};

/// Abstraction over the market-data collaborator.
///
/// Implementations must never block indefinitely; the orchestrator wraps
/// every call in a bounded timeout and falls back to cached or synthetic
/// data when the provider fails. A timeframe that cannot be delivered is
/// returned as an empty series, not an error.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the 15m/1h/4h candle series for one asset.
    async fn multi_timeframe(&self, asset: &str) -> Result<MultiTimeframeData>;

    /// Latest live price for an asset. Implementations return the
    /// last-known value when live data is stale beyond their freshness
    /// window.
    async fn real_time(&self, asset: &str) -> Result<Quote>;
}
