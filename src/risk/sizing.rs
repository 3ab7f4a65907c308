//! Position sizing: Optimal f, Kelly criterion, risk of ruin, and the
//! zero-ruin-constrained size derivation.
//!
//! Every function here is pure and total: degenerate input produces a
//! conservative value plus a warning, never a panic or an error.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::ClosedTrade;

use super::RiskMetrics;

/// Risk-of-ruin ceiling for the zero-ruin constraint.
pub const MAX_RISK_OF_RUIN: f64 = 1e-4;

/// Fallback fraction when history is too thin for Optimal f.
const CONSERVATIVE_F: f64 = 0.02;

/// Hard cap on Optimal f.
const OPTIMAL_F_CAP: f64 = 0.25;

/// Minimum trades before the statistical sizing formulae are trusted.
const MIN_TRADES: usize = 10;

/// Final position-size clamp as fractions of balance.
const MIN_SIZE_FRACTION: f64 = 0.005;
const MAX_SIZE_FRACTION: f64 = 0.25;

/// How much of a raw Kelly fraction to actually deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum KellyMode {
    Full,
    Half,
    #[default]
    Quarter,
}

impl KellyMode {
    pub fn apply(&self, fraction: f64) -> f64 {
        match self {
            KellyMode::Full => fraction,
            KellyMode::Half => fraction * 0.5,
            KellyMode::Quarter => fraction * 0.25,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KellyMode::Full => "FULL",
            KellyMode::Half => "HALF",
            KellyMode::Quarter => "QUARTER",
        }
    }
}

impl std::str::FromStr for KellyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(KellyMode::Full),
            "half" => Ok(KellyMode::Half),
            "quarter" => Ok(KellyMode::Quarter),
            other => Err(format!("unknown kelly mode: {}", other)),
        }
    }
}

/// Sizing recommendation plus the risk statistics behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSizeResult {
    /// Ralph Vince's Optimal f, capped to [0, 0.25]
    pub optimal_f: f64,

    /// Raw Kelly fraction in [0, 1] (before the mode multiplier)
    pub kelly_fraction: f64,

    /// Risk of ruin for the chosen per-trade risk, in [0, 1]
    pub risk_of_ruin: f64,

    /// Recommended margin, in [0, balance]
    pub safe_position_size: Decimal,

    /// Whether the final size keeps risk of ruin at or below the ceiling
    pub is_zero_ruin_safe: bool,

    /// Human-readable caveats; non-empty whenever inputs were degenerate
    /// or statistics were thin
    pub warnings: Vec<String>,
}

impl PositionSizeResult {
    fn zero(warnings: Vec<String>) -> Self {
        Self {
            optimal_f: 0.0,
            kelly_fraction: 0.0,
            risk_of_ruin: 1.0,
            safe_position_size: Decimal::ZERO,
            is_zero_ruin_safe: false,
            warnings,
        }
    }
}

/// Ralph Vince's Optimal f: grid search over f in (0, 1] maximizing the
/// Terminal Wealth Relative of holding-period returns anchored to the
/// largest historical loss.
///
/// Fewer than 10 trades, or a history with no losses, yields a flat
/// conservative 2%.
pub fn optimal_f(trades: &[ClosedTrade]) -> f64 {
    if trades.len() < MIN_TRADES {
        return CONSERVATIVE_F;
    }

    let pnls: Vec<f64> = trades
        .iter()
        .map(|t| t.realized_pnl.to_f64().unwrap_or(0.0))
        .collect();

    let largest_loss = pnls
        .iter()
        .filter(|&&p| p < 0.0)
        .fold(0.0f64, |acc, &p| acc.max(-p));
    if largest_loss <= 0.0 {
        // Nothing anchors the HPRs without a losing trade
        return CONSERVATIVE_F;
    }

    let mut best_f = CONSERVATIVE_F;
    let mut best_twr = 0.0f64;

    'grid: for step in 1..=100 {
        let f = step as f64 / 100.0;
        let mut twr = 1.0f64;

        for &pnl in &pnls {
            // HPR = 1 + f * (-pnl / largestLoss) with largestLoss negative;
            // largest_loss here is the magnitude, so the signs cancel
            let hpr = 1.0 + f * (pnl / largest_loss);
            if hpr <= 0.0 {
                continue 'grid;
            }
            twr *= hpr;
        }

        if twr > best_twr {
            best_twr = twr;
            best_f = f;
        }
    }

    best_f.min(OPTIMAL_F_CAP)
}

/// Kelly fraction f* = (b*p - q) / b with b = avgWin/avgLoss.
///
/// Zero when the system has no measurable edge (avgLoss or winRate zero,
/// or a negative numerator); clamped to [0, 1].
pub fn kelly_fraction(metrics: &RiskMetrics) -> f64 {
    let avg_loss = metrics.avg_loss_f64();
    if avg_loss <= 0.0 || metrics.win_rate <= 0.0 {
        return 0.0;
    }

    let b = metrics.avg_win_f64() / avg_loss;
    if b <= 0.0 {
        return 0.0;
    }

    let p = metrics.win_rate;
    let q = 1.0 - p;
    ((b * p - q) / b).clamp(0.0, 1.0)
}

/// Gambler's-ruin probability for a fixed risk per trade.
///
/// edge = (p*avgWin - q*avgLoss) / avgLoss; a non-positive edge is
/// certain ruin (1.0); otherwise ((1-edge)/(1+edge))^(balance/risk),
/// clamped to [0, 1].
pub fn risk_of_ruin(metrics: &RiskMetrics, risk_per_trade: f64, balance: f64) -> f64 {
    let avg_loss = metrics.avg_loss_f64();
    let p = metrics.win_rate;
    let q = 1.0 - p;

    // No losing trades on record: edge is unbounded, ruin unreachable
    if avg_loss <= 0.0 {
        return if p > 0.0 { 0.0 } else { 1.0 };
    }

    let edge = (p * metrics.avg_win_f64() - q * avg_loss) / avg_loss;
    if edge <= 0.0 {
        return 1.0;
    }
    if edge >= 1.0 {
        return 0.0;
    }
    if balance <= 0.0 {
        return 1.0;
    }
    if risk_per_trade <= 0.0 {
        // Nothing risked per trade: ruin cannot occur with a positive edge
        return 0.0;
    }

    let units = balance / risk_per_trade;
    (((1.0 - edge) / (1.0 + edge)).powf(units)).clamp(0.0, 1.0)
}

/// Largest per-trade risk whose risk of ruin stays at or below `max_ror`.
///
/// 50-iteration binary search over [0, 0.5 * balance]; monotonicity of
/// risk-of-ruin in the risk size makes the bisection exact enough.
pub fn find_zero_ruin_size(metrics: &RiskMetrics, balance: f64, max_ror: f64) -> f64 {
    if balance <= 0.0 {
        return 0.0;
    }

    let mut lo = 0.0f64;
    let mut hi = balance * 0.5;

    for _ in 0..50 {
        let mid = (lo + hi) / 2.0;
        if risk_of_ruin(metrics, mid, balance) <= max_ror {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    lo
}

/// Full sizing pipeline: min(Optimal f, mode-adjusted Kelly) as the
/// working risk fraction, converted to margin through the stop distance
/// and leverage, re-derived through the zero-ruin search when the implied
/// risk of ruin exceeds the ceiling, and finally clamped to
/// [0.5%, 25%] of balance.
pub fn optimal_position_size(
    trades: &[ClosedTrade],
    balance: Decimal,
    entry_price: f64,
    stop_price: f64,
    leverage: f64,
    kelly_mode: KellyMode,
) -> PositionSizeResult {
    let mut warnings = Vec::new();

    let balance_f = balance.to_f64().unwrap_or(0.0);
    if balance_f <= 0.0 {
        warnings.push("balance must be positive; no position can be sized".to_string());
        return PositionSizeResult::zero(warnings);
    }

    let stop_pct = if entry_price > 0.0 {
        (entry_price - stop_price).abs() / entry_price
    } else {
        0.0
    };
    if stop_pct <= 0.0 {
        warnings.push("entry and stop collapse to a zero stop distance".to_string());
        return PositionSizeResult::zero(warnings);
    }

    let leverage = if leverage > 0.0 { leverage } else { 1.0 };
    let metrics = RiskMetrics::from_trades(trades);

    if trades.len() < MIN_TRADES {
        warnings.push(format!(
            "only {} historical trades (<{}); sizing uses conservative fallbacks",
            trades.len(),
            MIN_TRADES
        ));
    }
    if leverage > 10.0 && kelly_mode == KellyMode::Full {
        warnings.push("high leverage combined with full Kelly".to_string());
    }
    if metrics.profit_factor < 1.2 {
        warnings.push(format!(
            "profit factor {:.2} below 1.2",
            metrics.profit_factor
        ));
    }
    if metrics.max_drawdown > 0.3 {
        warnings.push(format!(
            "historical max drawdown {:.0}% above 30%",
            metrics.max_drawdown * 100.0
        ));
    }

    let of = optimal_f(trades);
    let kelly_raw = kelly_fraction(&metrics);
    let working_fraction = of.min(kelly_mode.apply(kelly_raw));

    let mut risk_amount = working_fraction * balance_f;
    let mut ror = risk_of_ruin(&metrics, risk_amount, balance_f);

    let is_zero_ruin_safe = if ror > MAX_RISK_OF_RUIN {
        risk_amount = find_zero_ruin_size(&metrics, balance_f, MAX_RISK_OF_RUIN);
        ror = risk_of_ruin(&metrics, risk_amount, balance_f);
        ror <= MAX_RISK_OF_RUIN
    } else {
        true
    };

    // Margin that loses `risk_amount` if the stop is hit at this leverage
    let margin = risk_amount / (stop_pct * leverage);
    let clamped = margin
        .clamp(balance_f * MIN_SIZE_FRACTION, balance_f * MAX_SIZE_FRACTION)
        .min(balance_f);

    debug!(
        optimal_f = of,
        kelly = kelly_raw,
        risk_amount,
        risk_of_ruin = ror,
        margin = clamped,
        "position sized"
    );

    PositionSizeResult {
        optimal_f: of,
        kelly_fraction: kelly_raw,
        risk_of_ruin: ror,
        safe_position_size: Decimal::try_from(clamped).unwrap_or(Decimal::ZERO),
        is_zero_ruin_safe,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::metrics::test_fixtures::history;
    use rust_decimal_macros::dec;

    fn profitable_metrics() -> RiskMetrics {
        let mut m = RiskMetrics::conservative_default();
        m.win_rate = 0.6;
        m.avg_win = dec!(100);
        m.avg_loss = dec!(50);
        m.total_trades = 50;
        m
    }

    #[test]
    fn test_optimal_f_thin_history_is_conservative() {
        assert_eq!(optimal_f(&history(&[100, -50])), CONSERVATIVE_F);
        // No losses to anchor the grid
        assert_eq!(
            optimal_f(&history(&[10, 20, 30, 40, 50, 60, 70, 80, 90, 100])),
            CONSERVATIVE_F
        );
    }

    #[test]
    fn test_optimal_f_capped() {
        // Strongly profitable history pushes raw f high; cap holds
        let trades = history(&[200, 180, -20, 220, 190, -25, 210, 230, 205, -15, 240, 185]);
        let f = optimal_f(&trades);
        assert!(f > 0.0);
        assert!(f <= OPTIMAL_F_CAP);
    }

    #[test]
    fn test_kelly_profitable_and_unprofitable() {
        let m = profitable_metrics();
        // b=2, p=0.6: (2*0.6 - 0.4)/2 = 0.4
        assert!((kelly_fraction(&m) - 0.4).abs() < 1e-9);

        let mut losing = profitable_metrics();
        losing.win_rate = 0.3;
        losing.avg_win = dec!(50);
        losing.avg_loss = dec!(50);
        assert_eq!(kelly_fraction(&losing), 0.0);

        let mut no_losses = profitable_metrics();
        no_losses.avg_loss = dec!(0);
        assert_eq!(kelly_fraction(&no_losses), 0.0);
    }

    #[test]
    fn test_kelly_mode_scaling() {
        assert_eq!(KellyMode::Full.apply(0.4), 0.4);
        assert_eq!(KellyMode::Half.apply(0.4), 0.2);
        assert_eq!(KellyMode::Quarter.apply(0.4), 0.1);
    }

    #[test]
    fn test_risk_of_ruin_bounds_and_edge() {
        let m = profitable_metrics();
        let ror = risk_of_ruin(&m, 200.0, 10_000.0);
        assert!((0.0..=1.0).contains(&ror));

        let mut no_edge = profitable_metrics();
        no_edge.win_rate = 0.3;
        no_edge.avg_win = dec!(50);
        assert_eq!(risk_of_ruin(&no_edge, 200.0, 10_000.0), 1.0);
    }

    #[test]
    fn test_risk_of_ruin_monotone_in_risk() {
        let m = profitable_metrics();
        let small = risk_of_ruin(&m, 200.0, 10_000.0);
        let large = risk_of_ruin(&m, 2000.0, 10_000.0);
        assert!(small < large);
    }

    #[test]
    fn test_zero_ruin_search() {
        let m = profitable_metrics();
        let size = find_zero_ruin_size(&m, 10_000.0, MAX_RISK_OF_RUIN);
        assert!(size > 0.0);
        assert!(size <= 5000.0);
        assert!(risk_of_ruin(&m, size, 10_000.0) <= MAX_RISK_OF_RUIN);

        // A slightly larger size must breach the ceiling
        assert!(risk_of_ruin(&m, size * 1.05, 10_000.0) > MAX_RISK_OF_RUIN);
    }

    #[test]
    fn test_optimal_position_size_bounds() {
        let trades = history(&[100, -50, 200, -30, 150, 80, -40, 120, 90, -20, 110, 60]);
        let result = optimal_position_size(
            &trades,
            dec!(10000),
            100_000.0,
            94_000.0,
            10.0,
            KellyMode::Quarter,
        );

        assert!(result.safe_position_size >= Decimal::ZERO);
        assert!(result.safe_position_size <= dec!(10000));
        assert!(result.safe_position_size <= dec!(2500)); // 25% cap
        assert!((0.0..=0.25).contains(&result.optimal_f));
        assert!((0.0..=1.0).contains(&result.kelly_fraction));
        assert!((0.0..=1.0).contains(&result.risk_of_ruin));
    }

    #[test]
    fn test_warnings_on_thin_history() {
        let result = optimal_position_size(
            &history(&[100, -50]),
            dec!(10000),
            100_000.0,
            94_000.0,
            10.0,
            KellyMode::Quarter,
        );
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("historical trades")));
    }

    #[test]
    fn test_warning_on_full_kelly_high_leverage() {
        let trades = history(&[100, -50, 200, -30, 150, 80, -40, 120, 90, -20, 110, 60]);
        let result = optimal_position_size(
            &trades,
            dec!(10000),
            100_000.0,
            94_000.0,
            15.0,
            KellyMode::Full,
        );
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("full Kelly")));
    }

    #[test]
    fn test_degenerate_inputs_return_values_with_warnings() {
        let zero_balance = optimal_position_size(
            &[],
            dec!(0),
            100_000.0,
            94_000.0,
            10.0,
            KellyMode::Quarter,
        );
        assert_eq!(zero_balance.safe_position_size, Decimal::ZERO);
        assert!(!zero_balance.warnings.is_empty());

        let flat_stop = optimal_position_size(
            &[],
            dec!(10000),
            100_000.0,
            100_000.0,
            10.0,
            KellyMode::Quarter,
        );
        assert_eq!(flat_stop.safe_position_size, Decimal::ZERO);
        assert!(!flat_stop.warnings.is_empty());
    }
}
