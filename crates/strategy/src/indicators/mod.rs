mod bollinger;
mod ema;
mod levels;
mod macd;
mod rsi;
mod vwap;

pub use bollinger::{bollinger, sma, BollingerBands};
pub use ema::ema;
pub use levels::{average_volume, resistance, support};
pub use macd::{macd, Macd};
pub use rsi::rsi;
pub use vwap::vwap;
