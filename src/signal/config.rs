//! Signal engine and auto-trade configuration.

use serde::{Deserialize, Serialize};

use crate::models::Timeframe;

/// Tunables for signal derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEngineConfig {
    /// Divisor applied on top of volatility when deriving leverage;
    /// higher is more conservative
    pub safety_factor: f64,

    /// ATR multiple for the Chandelier stop
    pub atr_multiplier: f64,

    /// Reward multiple relative to the stop distance
    pub min_risk_reward_ratio: f64,

    pub max_leverage: f64,

    pub min_leverage: f64,

    pub timeframe: Timeframe,
}

impl Default for SignalEngineConfig {
    fn default() -> Self {
        Self {
            safety_factor: 2.0,
            atr_multiplier: 3.0,
            min_risk_reward_ratio: 2.0,
            max_leverage: 20.0,
            min_leverage: 1.0,
            timeframe: Timeframe::D1,
        }
    }
}

/// Gate conditions for unattended execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoTradeSettings {
    /// Master switch; everything else is moot when false
    pub enabled: bool,

    /// Minimum signal confidence (0-100) to auto-execute
    pub confidence_threshold: f64,

    /// Reject signals recommending more than this leverage
    pub max_leverage: f64,

    pub risk_reward_ratio: f64,

    pub safety_factor: f64,
}

impl Default for AutoTradeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            confidence_threshold: 75.0,
            max_leverage: 20.0,
            risk_reward_ratio: 2.0,
            safety_factor: 2.0,
        }
    }
}
