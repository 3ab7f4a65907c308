//! Trading session ledger: wallet, open positions, and trade history
//! behind a single serialized transition surface.
//!
//! All mutation goes through `&mut self` methods, so every update is
//! indivisible from the caller's point of view: no observer can see the
//! margin moved without the position appended, or vice versa.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::clock::Stamper;
use crate::error::EngineError;
use crate::models::{ClosedTrade, LivePosition, SignalSetup, WalletState};
use crate::signal::AutoTradeSettings;

use super::fsm::{dispatch, BotAction, BotStatus};

/// One trading session: capital ledger, open set, history, and the bot
/// activation state. Single-writer by construction.
pub struct TradingSession {
    wallet: WalletState,
    positions: Vec<LivePosition>,
    history: Vec<ClosedTrade>,
    status: BotStatus,
    settings: AutoTradeSettings,
    /// Bumped on every successful FSM transition; lets the cooldown
    /// timer detect that it has been superseded
    generation: u64,
    stamper: Arc<dyn Stamper>,
}

impl TradingSession {
    pub fn new(
        initial_balance: Decimal,
        settings: AutoTradeSettings,
        stamper: Arc<dyn Stamper>,
    ) -> Self {
        Self {
            wallet: WalletState::new(initial_balance),
            positions: Vec::new(),
            history: Vec::new(),
            status: BotStatus::Idle,
            settings,
            generation: 0,
            stamper,
        }
    }

    pub fn wallet(&self) -> &WalletState {
        &self.wallet
    }

    pub fn positions(&self) -> &[LivePosition] {
        &self.positions
    }

    pub fn history(&self) -> &[ClosedTrade] {
        &self.history
    }

    pub fn status(&self) -> BotStatus {
        self.status
    }

    pub fn settings(&self) -> &AutoTradeSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AutoTradeSettings) {
        self.settings = settings;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drive the bot FSM. An illegal request is a no-op: the state is
    /// left unchanged and the error names the rejected edge.
    pub fn apply(&mut self, action: BotAction) -> Result<BotStatus, EngineError> {
        let next = dispatch(self.status, action)?;
        debug!(from = self.status.as_str(), to = next.as_str(), "bot transition");
        self.status = next;
        self.generation += 1;
        Ok(next)
    }

    /// Open a position against the signal in one indivisible update:
    /// margin moves available -> locked and the position joins the open
    /// set together, or nothing happens at all.
    pub fn execute(&mut self, signal: &SignalSetup, margin: Decimal) -> Result<uuid::Uuid, EngineError> {
        if margin <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "margin must be positive, got {}",
                margin
            )));
        }
        let entry = Decimal::try_from(signal.entry_price)
            .map_err(|_| EngineError::InvalidInput("entry price not representable".to_string()))?;
        if entry <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "entry price must be positive, got {}",
                entry
            )));
        }
        let leverage = Decimal::try_from(signal.leverage)
            .map_err(|_| EngineError::InvalidInput("leverage not representable".to_string()))?;

        if margin > self.wallet.available {
            return Err(EngineError::InsufficientBalance {
                requested: margin,
                available: self.wallet.available,
            });
        }

        let position = LivePosition::open(
            self.stamper.next_id(),
            signal.asset.clone(),
            signal.direction,
            entry,
            margin,
            leverage,
            self.stamper.now(),
        );
        let id = position.id;

        self.wallet.available -= margin;
        self.wallet.locked += margin;
        self.positions.push(position);

        info!(
            %id,
            asset = %signal.asset,
            direction = signal.direction.as_str(),
            %margin,
            "position opened"
        );
        debug_assert!(self.wallet.conservation_holds());

        Ok(id)
    }

    /// Close a position at the given exit price: realized pnl settles,
    /// margin unlocks, and the immutable history record appends, all in
    /// one indivisible update.
    pub fn close(&mut self, position_id: uuid::Uuid, exit_price: Decimal) -> Result<ClosedTrade, EngineError> {
        let index = self
            .positions
            .iter()
            .position(|p| p.id == position_id)
            .ok_or(EngineError::UnknownPosition(position_id))?;

        let position = self.positions.remove(index);
        let pnl = position.pnl_at(exit_price);

        self.wallet.locked -= position.margin;
        self.wallet.available += position.margin + pnl;
        self.wallet.balance += pnl;
        self.wallet.total_pnl += pnl;
        self.refresh_unrealized();

        let record = ClosedTrade {
            position_id: position.id,
            asset: position.asset,
            direction: position.direction,
            entry_price: position.entry_price,
            exit_price,
            size: position.size,
            margin: position.margin,
            leverage: position.leverage,
            realized_pnl: pnl,
            opened_at: position.opened_at,
            closed_at: self.stamper.now(),
        };
        self.history.push(record.clone());

        info!(
            id = %record.position_id,
            asset = %record.asset,
            pnl = %pnl,
            "position closed"
        );
        debug_assert!(self.wallet.conservation_holds());

        Ok(record)
    }

    /// Batch mark-to-market: every open position whose asset appears in
    /// the map is re-marked, then aggregate unrealized pnl and equity are
    /// recomputed. O(open positions); batches must be applied in arrival
    /// order by the single writer.
    pub fn apply_mark_prices(&mut self, prices: &HashMap<String, Decimal>) {
        for position in &mut self.positions {
            if let Some(&price) = prices.get(&position.asset) {
                position.mark(price);
            }
        }
        self.refresh_unrealized();
        debug_assert!(self.wallet.conservation_holds());
    }

    /// Whether a signal qualifies for unattended execution. Every failing
    /// condition silently disables auto-trade; this is a gate, not an
    /// error path.
    pub fn should_auto_execute(&self, signal: &SignalSetup) -> bool {
        if self.status != BotStatus::Idle {
            return false;
        }
        if !self.settings.enabled {
            return false;
        }
        if signal.confidence_score < self.settings.confidence_threshold {
            return false;
        }
        if signal.leverage > self.settings.max_leverage {
            warn!(
                asset = %signal.asset,
                leverage = signal.leverage,
                cap = self.settings.max_leverage,
                "auto-trade skipped: leverage above cap"
            );
            return false;
        }
        if self.positions.iter().any(|p| p.asset == signal.asset) {
            return false;
        }
        true
    }

    /// Explicit user-initiated reset: fresh wallet, empty open set and
    /// history, FSM back to IDLE.
    pub fn reset(&mut self, initial_balance: Decimal) {
        info!(%initial_balance, "session reset");
        self.wallet = WalletState::new(initial_balance);
        self.positions.clear();
        self.history.clear();
        self.status = BotStatus::Idle;
        self.generation += 1;
    }

    fn refresh_unrealized(&mut self) {
        self.wallet.unrealized_pnl = self.positions.iter().map(|p| p.unrealized_pnl).sum();
        self.wallet.equity = self.wallet.balance + self.wallet.unrealized_pnl;
    }
}
