//! Wallet ledger state for one trading session.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Single source of truth for session capital.
///
/// Created once per session, mutated only through the ledger's atomic
/// transitions, and explicitly reset by user action. Invariants that hold
/// after every transition:
///
/// - `available + locked == balance`
/// - `balance == initial_balance + total_pnl` (sum of realized pnl)
/// - `equity == balance + unrealized_pnl`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    /// Realized capital: initial balance plus all realized pnl
    pub balance: Decimal,

    /// Capital free to be committed as margin
    pub available: Decimal,

    /// Margin currently reserved against open positions
    pub locked: Decimal,

    /// balance + unrealized pnl, recomputed on every mark-price batch
    pub equity: Decimal,

    /// Cumulative realized pnl since session start
    pub total_pnl: Decimal,

    /// Aggregate unrealized pnl over open positions
    pub unrealized_pnl: Decimal,

    /// Balance the session started with
    pub initial_balance: Decimal,
}

impl WalletState {
    /// Fresh wallet with everything available.
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            balance: initial_balance,
            available: initial_balance,
            locked: Decimal::ZERO,
            equity: initial_balance,
            total_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            initial_balance,
        }
    }

    /// Check every ledger-conservation invariant.
    pub fn conservation_holds(&self) -> bool {
        self.available + self.locked == self.balance
            && self.balance == self.initial_balance + self.total_pnl
            && self.equity == self.balance + self.unrealized_pnl
    }

    /// Session return relative to the initial balance, as a fraction.
    pub fn return_pct(&self) -> Decimal {
        if self.initial_balance.is_zero() {
            return Decimal::ZERO;
        }
        self.total_pnl / self.initial_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fresh_wallet_conserves() {
        let wallet = WalletState::new(dec!(10000));
        assert!(wallet.conservation_holds());
        assert_eq!(wallet.available, dec!(10000));
        assert_eq!(wallet.locked, dec!(0));
        assert_eq!(wallet.equity, dec!(10000));
    }

    #[test]
    fn test_conservation_detects_drift() {
        let mut wallet = WalletState::new(dec!(10000));
        wallet.available -= dec!(500); // locked not adjusted
        assert!(!wallet.conservation_holds());

        wallet.locked += dec!(500);
        assert!(wallet.conservation_holds());
    }

    #[test]
    fn test_return_pct() {
        let mut wallet = WalletState::new(dec!(10000));
        wallet.total_pnl = dec!(1500);
        wallet.balance = dec!(11500);
        wallet.available = dec!(11500);
        wallet.equity = dec!(11500);
        assert_eq!(wallet.return_pct(), dec!(0.15));
    }
}
