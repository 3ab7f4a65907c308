//! Execution engine: bot state machine, session ledger, and async host.

mod fsm;
mod host;
mod ledger;

pub use fsm::{can_transition_to, dispatch, BotAction, BotStatus};
pub use host::{SessionHost, DEFAULT_COOLDOWN};
pub use ledger::TradingSession;
