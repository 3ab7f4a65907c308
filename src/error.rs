//! Core error values.
//!
//! Only two classes of failure are surfaced as errors: illegal FSM
//! transitions and ledger violations. Pure numeric edge cases degrade to
//! documented defaults instead.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::engine::BotStatus;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Requested margin exceeds the available balance; no state changed.
    #[error("insufficient balance: requested margin {requested} exceeds available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    /// Transition outside the adjacency table; state is left unchanged.
    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition { from: BotStatus, to: BotStatus },

    /// Close requested for a position id not in the open set.
    #[error("unknown position: {0}")]
    UnknownPosition(Uuid),

    /// Input outside its documented domain where degrading is impossible.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
