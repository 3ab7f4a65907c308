//! Signal generation: configuration and the setup derivation pipeline.

mod config;
mod generator;

pub use config::{AutoTradeSettings, SignalEngineConfig};
pub use generator::{leverage, risk_level, stop_loss, take_profit, SignalGenerator};
