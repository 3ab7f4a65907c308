//! Risk metrics and ruin-bounded position sizing.

mod metrics;
mod sizing;

pub use metrics::RiskMetrics;
pub use sizing::{
    find_zero_ruin_size, kelly_fraction, optimal_f, optimal_position_size, risk_of_ruin,
    KellyMode, PositionSizeResult, MAX_RISK_OF_RUIN,
};
