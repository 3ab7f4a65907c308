//! Decision-support engine for leveraged crypto trading.
//!
//! Turns a market snapshot into a complete trade setup (direction, entry,
//! Chandelier stop, take-profit, volatility-scaled leverage, confidence),
//! sizes it with ruin-bounded Kelly/Optimal-f math, and tracks execution
//! through a bot state machine over an exactly-conserving wallet ledger.
//!
//! Money amounts are `rust_decimal::Decimal` end to end so the ledger
//! invariants hold exactly; statistical ratios and prices inside the
//! analyzers stay `f64`.

pub mod analysis;
pub mod clock;
pub mod engine;
pub mod error;
pub mod models;
pub mod risk;
pub mod signal;

pub use clock::{FixedStamper, Stamper, SystemStamper};
pub use engine::{BotAction, BotStatus, SessionHost, TradingSession};
pub use error::EngineError;
pub use models::{
    ClosedTrade, Direction, LivePosition, MarketConditions, Regime, RiskLevel, SignalSetup,
    Timeframe, WalletState,
};
pub use risk::{optimal_position_size, KellyMode, PositionSizeResult, RiskMetrics};
pub use signal::{AutoTradeSettings, SignalEngineConfig, SignalGenerator};
