//! Live position and closed-trade records.
//!
//! Money fields are `Decimal` so the ledger's conservation invariants hold
//! exactly; statistical ratios stay `f64` elsewhere in the crate.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Direction;

/// An open leveraged position held against locked margin.
///
/// Created by `TradingSession::execute`, re-marked by `apply_mark_prices`,
/// and converted into an immutable [`ClosedTrade`] on close. Never mutated
/// through any other path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivePosition {
    pub id: Uuid,

    pub asset: String,

    pub direction: Direction,

    pub entry_price: Decimal,

    /// Last mark price applied to this position
    pub current_price: Decimal,

    /// Position size in base-asset units (margin * leverage / entry)
    pub size: Decimal,

    pub leverage: Decimal,

    /// Collateral reserved against this position
    pub margin: Decimal,

    pub unrealized_pnl: Decimal,

    /// Price at which the position would be forcibly closed:
    /// entry * (1 - 1/leverage) long, entry * (1 + 1/leverage) short
    pub liquidation_price: Decimal,

    pub opened_at: DateTime<Utc>,
}

impl LivePosition {
    /// Open a position: derives size and liquidation price from the margin,
    /// leverage, and entry price.
    pub fn open(
        id: Uuid,
        asset: impl Into<String>,
        direction: Direction,
        entry_price: Decimal,
        margin: Decimal,
        leverage: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Self {
        let size = if entry_price > Decimal::ZERO {
            margin * leverage / entry_price
        } else {
            Decimal::ZERO
        };
        let liquidation_price = if leverage > Decimal::ZERO {
            match direction {
                Direction::Long => entry_price * (Decimal::ONE - Decimal::ONE / leverage),
                Direction::Short => entry_price * (Decimal::ONE + Decimal::ONE / leverage),
            }
        } else {
            Decimal::ZERO
        };

        Self {
            id,
            asset: asset.into(),
            direction,
            entry_price,
            current_price: entry_price,
            size,
            leverage,
            margin,
            unrealized_pnl: Decimal::ZERO,
            liquidation_price,
            opened_at,
        }
    }

    /// Direction-aware pnl at a given price.
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        match self.direction {
            Direction::Long => (price - self.entry_price) * self.size,
            Direction::Short => (self.entry_price - price) * self.size,
        }
    }

    /// Apply a new mark price and recompute unrealized pnl.
    pub fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        self.unrealized_pnl = self.pnl_at(price);
    }
}

/// Immutable record of a closed position. Append-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    /// Id of the position this trade closed
    pub position_id: Uuid,

    pub asset: String,

    pub direction: Direction,

    pub entry_price: Decimal,

    pub exit_price: Decimal,

    pub size: Decimal,

    pub margin: Decimal,

    pub leverage: Decimal,

    pub realized_pnl: Decimal,

    pub opened_at: DateTime<Utc>,

    pub closed_at: DateTime<Utc>,
}

impl ClosedTrade {
    /// How long the position was held.
    pub fn duration(&self) -> Duration {
        self.closed_at - self.opened_at
    }

    pub fn is_win(&self) -> bool {
        self.realized_pnl > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn open_long() -> LivePosition {
        LivePosition::open(
            Uuid::nil(),
            "BTCUSDT",
            Direction::Long,
            dec!(100000),
            dec!(500),
            dec!(10),
            Utc::now(),
        )
    }

    #[test]
    fn test_size_and_liquidation() {
        let pos = open_long();
        // 500 margin * 10x / 100k = 0.05 BTC
        assert_eq!(pos.size, dec!(0.05));
        // 100k * (1 - 1/10) = 90k
        assert_eq!(pos.liquidation_price, dec!(90000));
    }

    #[test]
    fn test_mark_updates_unrealized() {
        let mut pos = open_long();
        pos.mark(dec!(102000));
        assert_eq!(pos.unrealized_pnl, dec!(100)); // 2000 * 0.05

        pos.mark(dec!(98000));
        assert_eq!(pos.unrealized_pnl, dec!(-100));
    }

    #[test]
    fn test_short_pnl_inverts() {
        let mut pos = open_long();
        pos.direction = Direction::Short;
        assert_eq!(pos.pnl_at(dec!(98000)), dec!(100));
        assert_eq!(pos.pnl_at(dec!(102000)), dec!(-100));
    }
}
