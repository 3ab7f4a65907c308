//! Risk metrics derived from a closed-trade history window.
//!
//! Recomputed from scratch on every call; nothing here is persisted.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::ClosedTrade;

/// Aggregate performance statistics over a trade-history window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Fraction of trades that won, in [0, 1]
    pub win_rate: f64,

    /// Average profit of winning trades (absolute)
    pub avg_win: Decimal,

    /// Average loss of losing trades (absolute value)
    pub avg_loss: Decimal,

    /// Average winning return relative to margin
    pub avg_win_pct: f64,

    /// Average losing return relative to margin (absolute value)
    pub avg_loss_pct: f64,

    /// Gross profit / gross loss; infinity when profitable with zero
    /// losses, 1.0 when there are no trades
    pub profit_factor: f64,

    /// Expected pnl per trade: winRate * avgWin - (1 - winRate) * avgLoss
    pub expectancy: Decimal,

    /// Peak-to-trough fraction over the chronological equity curve, [0, 1]
    pub max_drawdown: f64,

    pub total_trades: u32,
}

impl RiskMetrics {
    /// Conservative defaults for an empty history: a coin-flip win rate
    /// with no measured edge. Never an error.
    pub fn conservative_default() -> Self {
        Self {
            win_rate: 0.5,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            avg_win_pct: 0.0,
            avg_loss_pct: 0.0,
            profit_factor: 1.0,
            expectancy: Decimal::ZERO,
            max_drawdown: 0.0,
            total_trades: 0,
        }
    }

    /// Compute metrics from a trade history window.
    ///
    /// Trades are sorted chronologically before the drawdown walk, so the
    /// caller may pass them in any order.
    pub fn from_trades(trades: &[ClosedTrade]) -> Self {
        if trades.is_empty() {
            return Self::conservative_default();
        }

        let mut sorted: Vec<&ClosedTrade> = trades.iter().collect();
        sorted.sort_by_key(|t| t.closed_at);

        let pnls: Vec<Decimal> = sorted.iter().map(|t| t.realized_pnl).collect();
        let (wins, losses): (Vec<_>, Vec<_>) = pnls.iter().partition(|&&p| p > Decimal::ZERO);

        let win_rate = wins.len() as f64 / pnls.len() as f64;

        let avg_win = if wins.is_empty() {
            Decimal::ZERO
        } else {
            wins.iter().copied().sum::<Decimal>() / Decimal::from(wins.len() as u32)
        };
        let avg_loss = if losses.is_empty() {
            Decimal::ZERO
        } else {
            losses.iter().copied().map(|l: Decimal| l.abs()).sum::<Decimal>()
                / Decimal::from(losses.len() as u32)
        };

        let gross_profit: Decimal = wins.iter().copied().sum();
        let gross_loss: Decimal = losses.iter().copied().map(|l: Decimal| l.abs()).sum();
        let profit_factor = if gross_loss > Decimal::ZERO {
            gross_profit.to_f64().unwrap_or(0.0) / gross_loss.to_f64().unwrap_or(1.0)
        } else if gross_profit > Decimal::ZERO {
            f64::INFINITY
        } else {
            1.0
        };

        let p = Decimal::try_from(win_rate).unwrap_or(Decimal::ZERO);
        let expectancy = p * avg_win - (Decimal::ONE - p) * avg_loss;

        let (avg_win_pct, avg_loss_pct) = margin_relative_averages(&sorted);

        Self {
            win_rate,
            avg_win,
            avg_loss,
            avg_win_pct,
            avg_loss_pct,
            profit_factor,
            expectancy,
            max_drawdown: max_drawdown(&pnls),
            total_trades: pnls.len() as u32,
        }
    }

    /// avg_win as f64 for the sizing formulae.
    pub fn avg_win_f64(&self) -> f64 {
        self.avg_win.to_f64().unwrap_or(0.0)
    }

    /// avg_loss as f64 for the sizing formulae.
    pub fn avg_loss_f64(&self) -> f64 {
        self.avg_loss.to_f64().unwrap_or(0.0)
    }
}

/// Running peak-to-trough walk over the cumulative pnl curve.
///
/// Input must be in chronological order.
fn max_drawdown(pnls: &[Decimal]) -> f64 {
    let mut equity = Decimal::ZERO;
    let mut peak = Decimal::ZERO;
    let mut max_dd_pct = 0.0f64;

    for pnl in pnls {
        equity += pnl;

        if equity > peak {
            peak = equity;
        }

        if peak > Decimal::ZERO {
            let dd = peak - equity;
            let dd_pct = dd.to_f64().unwrap_or(0.0) / peak.to_f64().unwrap_or(1.0);
            if dd_pct > max_dd_pct {
                max_dd_pct = dd_pct;
            }
        }
    }

    max_dd_pct.clamp(0.0, 1.0)
}

fn margin_relative_averages(sorted: &[&ClosedTrade]) -> (f64, f64) {
    let mut win_pcts = Vec::new();
    let mut loss_pcts = Vec::new();

    for trade in sorted {
        if trade.margin <= Decimal::ZERO {
            continue;
        }
        let pct = (trade.realized_pnl / trade.margin).to_f64().unwrap_or(0.0);
        if pct > 0.0 {
            win_pcts.push(pct);
        } else if pct < 0.0 {
            loss_pcts.push(pct.abs());
        }
    }

    let avg = |v: &[f64]| {
        if v.is_empty() {
            0.0
        } else {
            v.iter().sum::<f64>() / v.len() as f64
        }
    };

    (avg(&win_pcts), avg(&loss_pcts))
}
