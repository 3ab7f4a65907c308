//! Regime & volatility analysis: Hurst exponent, OU mean-reversion fit,
//! and timeframe scaling.

mod ou;
mod regime;
mod volatility;

pub use ou::{estimate_ou_parameters, generate_ou_signal, OuParams, OuSignal};
pub use regime::{detect_regime, hurst_exponent};
pub use volatility::{atr_from_volatility, scale_for_timeframe};
