//! Data models for market snapshots, signals, positions, and the wallet ledger.

mod market;
mod position;
mod signal;
mod wallet;

pub use market::{MarketConditions, Timeframe};
pub use position::{ClosedTrade, LivePosition};
pub use signal::{Direction, Regime, RiskLevel, SignalSetup};
pub use wallet::WalletState;
