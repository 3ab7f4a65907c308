//! Async host around the session ledger.
//!
//! `TradingSession` itself is synchronous and single-writer; the host puts
//! it behind an `Arc<RwLock>` so the CLI, the signal loop, and the cooldown
//! timer can share it, and arms the timer that moves the bot out of
//! COOLDOWN on its own.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::EngineError;
use crate::models::SignalSetup;

use super::fsm::{BotAction, BotStatus};
use super::ledger::TradingSession;

/// Default time the bot rests in COOLDOWN after an execution settles.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

pub struct SessionHost {
    session: Arc<RwLock<TradingSession>>,
    cooldown: Duration,
}

impl SessionHost {
    pub fn new(session: TradingSession) -> Self {
        Self::with_cooldown(session, DEFAULT_COOLDOWN)
    }

    pub fn with_cooldown(session: TradingSession, cooldown: Duration) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            cooldown,
        }
    }

    /// Shared handle to the underlying session.
    pub fn session(&self) -> Arc<RwLock<TradingSession>> {
        Arc::clone(&self.session)
    }

    /// Drive the bot FSM. Entering COOLDOWN arms a one-shot timer that
    /// fires `CooldownExpired` unless another transition supersedes it
    /// first.
    pub async fn apply(&self, action: BotAction) -> Result<BotStatus, EngineError> {
        let (next, generation) = {
            let mut session = self.session.write().await;
            let next = session.apply(action)?;
            (next, session.generation())
        };
        if next == BotStatus::Cooldown {
            self.arm_cooldown(generation);
        }
        Ok(next)
    }

    /// Open a position, then walk the FSM through EXECUTING into COOLDOWN
    /// so the rest cycle starts ticking.
    pub async fn execute(
        &self,
        signal: &SignalSetup,
        margin: Decimal,
    ) -> Result<uuid::Uuid, EngineError> {
        let (id, generation) = {
            let mut session = self.session.write().await;
            session.apply(BotAction::Execute)?;
            let id = match session.execute(signal, margin) {
                Ok(id) => id,
                Err(e) => {
                    // Ledger rejected the trade; back the FSM out so the
                    // bot is not stuck in EXECUTING
                    session.apply(BotAction::FinishExecution)?;
                    session.apply(BotAction::CooldownExpired)?;
                    return Err(e);
                }
            };
            session.apply(BotAction::FinishExecution)?;
            (id, session.generation())
        };
        self.arm_cooldown(generation);
        Ok(id)
    }

    fn arm_cooldown(&self, generation: u64) {
        let session = Arc::clone(&self.session);
        let cooldown = self.cooldown;
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            let mut session = session.write().await;
            // A reset, abort, or later transition supersedes this timer
            if session.generation() == generation && session.status() == BotStatus::Cooldown {
                debug!("cooldown expired");
                let _ = session.apply(BotAction::CooldownExpired);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedStamper;
    use crate::models::{Direction, RiskLevel, Timeframe};
    use crate::signal::AutoTradeSettings;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn host() -> SessionHost {
        let session = TradingSession::new(
            dec!(10000),
            AutoTradeSettings::default(),
            Arc::new(FixedStamper::epoch()),
        );
        SessionHost::new(session)
    }

    fn signal() -> SignalSetup {
        SignalSetup {
            id: uuid::Uuid::nil(),
            asset: "BTCUSDT".to_string(),
            direction: Direction::Long,
            entry_price: 100_000.0,
            stop_loss_price: 94_000.0,
            take_profit_price: 112_000.0,
            leverage: 10.0,
            risk_reward_ratio: 2.0,
            confidence_score: 80.0,
            risk_level: RiskLevel::High,
            rationale: String::new(),
            regime: None,
            hurst_exponent: None,
            timeframe: Timeframe::D1,
            generated_at: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_expires_back_to_idle() {
        let host = host();
        host.apply(BotAction::LockSignal).await.unwrap();
        host.apply(BotAction::StartCountdown).await.unwrap();
        host.apply(BotAction::Execute).await.unwrap();
        let status = host.apply(BotAction::FinishExecution).await.unwrap();
        assert_eq!(status, BotStatus::Cooldown);

        // Let the timer task register its sleep before moving the clock
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        let session = host.session();
        assert_eq!(session.read().await.status(), BotStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_cooldown_timer_does_nothing() {
        let host = host();
        host.apply(BotAction::LockSignal).await.unwrap();
        host.apply(BotAction::StartCountdown).await.unwrap();
        host.apply(BotAction::Execute).await.unwrap();
        host.apply(BotAction::FinishExecution).await.unwrap();
        tokio::task::yield_now().await;

        // User clears the cooldown manually before the timer fires
        host.apply(BotAction::CooldownExpired).await.unwrap();
        host.apply(BotAction::StartAnalysis).await.unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        // Stale timer must not yank the bot out of ANALYZING
        let session = host.session();
        assert_eq!(session.read().await.status(), BotStatus::Analyzing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_opens_position_and_rests() {
        let host = host();
        host.apply(BotAction::LockSignal).await.unwrap();
        host.apply(BotAction::StartCountdown).await.unwrap();

        let id = host.execute(&signal(), dec!(500)).await.unwrap();

        {
            let session = host.session();
            let session = session.read().await;
            assert_eq!(session.status(), BotStatus::Cooldown);
            assert_eq!(session.positions().len(), 1);
            assert_eq!(session.positions()[0].id, id);
        }

        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        let session = host.session();
        assert_eq!(session.read().await.status(), BotStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_execute_backs_out_of_executing() {
        let host = host();
        host.apply(BotAction::LockSignal).await.unwrap();
        host.apply(BotAction::StartCountdown).await.unwrap();

        let err = host.execute(&signal(), dec!(99999)).await.unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance { .. }));

        let session = host.session();
        let session = session.read().await;
        assert_eq!(session.status(), BotStatus::Idle);
        assert!(session.positions().is_empty());
        assert!(session.wallet().conservation_holds());
    }
}
