//! Timeframe-aware scaling of volatility measures.

use crate::models::Timeframe;

/// Scale a daily-baseline value (volatility or ATR) to a timeframe by
/// square-root-of-time. Shorter timeframes only ever scale down.
pub fn scale_for_timeframe(base_value: f64, timeframe: Timeframe) -> f64 {
    base_value * timeframe.scale()
}

/// Derive an ATR proxy from daily volatility when the feed omits ATR.
/// A daily range of roughly one volatility unit of price is assumed.
pub fn atr_from_volatility(price: f64, daily_volatility: f64) -> f64 {
    (price * daily_volatility).max(0.0)
}
