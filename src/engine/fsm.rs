//! Bot activation state machine.
//!
//! A pure reducer over an explicit adjacency table: `dispatch` maps
//! (state, action) to the next state or rejects the request, leaving the
//! state untouched. No UI runtime, timers, or I/O in here; the cooldown
//! auto-expiry lives in the session host.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Bot activation state, one value per trading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotStatus {
    #[default]
    Idle,
    Analyzing,
    SignalLocked,
    Countdown,
    Executing,
    Cooldown,
}

impl BotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotStatus::Idle => "IDLE",
            BotStatus::Analyzing => "ANALYZING",
            BotStatus::SignalLocked => "SIGNAL_LOCKED",
            BotStatus::Countdown => "COUNTDOWN",
            BotStatus::Executing => "EXECUTING",
            BotStatus::Cooldown => "COOLDOWN",
        }
    }
}

/// Requests the session can make of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotAction {
    /// Begin scanning the market (IDLE -> ANALYZING)
    StartAnalysis,
    /// Pin a generated setup (IDLE/ANALYZING -> SIGNAL_LOCKED)
    LockSignal,
    /// Arm the pre-execution countdown (SIGNAL_LOCKED -> COUNTDOWN)
    StartCountdown,
    /// Fire the trade (COUNTDOWN -> EXECUTING)
    Execute,
    /// Execution settled (EXECUTING -> COOLDOWN)
    FinishExecution,
    /// Cooldown timer elapsed (COOLDOWN -> IDLE)
    CooldownExpired,
    /// Back out of any pre-execution state (-> IDLE)
    Abort,
}

/// Directed adjacency table of legal transitions. Nothing else is legal.
pub fn can_transition_to(from: BotStatus, to: BotStatus) -> bool {
    use BotStatus::*;
    matches!(
        (from, to),
        (Idle, Analyzing)
            | (Idle, SignalLocked)
            | (Analyzing, Idle)
            | (Analyzing, SignalLocked)
            | (SignalLocked, Countdown)
            | (SignalLocked, Idle)
            | (Countdown, Executing)
            | (Countdown, Idle)
            | (Executing, Cooldown)
            | (Cooldown, Idle)
    )
}

/// Target state an action asks for from a given state.
fn target_of(action: BotAction) -> BotStatus {
    use BotStatus::*;
    match action {
        BotAction::StartAnalysis => Analyzing,
        BotAction::LockSignal => SignalLocked,
        BotAction::StartCountdown => Countdown,
        BotAction::Execute => Executing,
        BotAction::FinishExecution => Cooldown,
        BotAction::CooldownExpired => Idle,
        // Abort from EXECUTING targets Idle too; the adjacency table
        // rejects it because execution must settle through cooldown
        BotAction::Abort => Idle,
    }
}

/// Pure transition function.
///
/// Returns the next state, or `InvalidTransition` with the state
/// conceptually unchanged (the caller keeps its current value).
pub fn dispatch(state: BotStatus, action: BotAction) -> Result<BotStatus, EngineError> {
    let to = target_of(action);
    if can_transition_to(state, to) {
        Ok(to)
    } else {
        Err(EngineError::InvalidTransition { from: state, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BotStatus::*;

    const ALL: [BotStatus; 6] = [Idle, Analyzing, SignalLocked, Countdown, Executing, Cooldown];

    #[test]
    fn test_happy_path() {
        let mut state = Idle;
        for action in [
            BotAction::StartAnalysis,
            BotAction::LockSignal,
            BotAction::StartCountdown,
            BotAction::Execute,
            BotAction::FinishExecution,
            BotAction::CooldownExpired,
        ] {
            state = dispatch(state, action).expect("happy path transition");
        }
        assert_eq!(state, Idle);
    }

    #[test]
    fn test_direct_lock_from_idle() {
        assert_eq!(dispatch(Idle, BotAction::LockSignal), Ok(SignalLocked));
    }

    #[test]
    fn test_abort_paths() {
        assert_eq!(dispatch(Analyzing, BotAction::Abort), Ok(Idle));
        assert_eq!(dispatch(SignalLocked, BotAction::Abort), Ok(Idle));
        assert_eq!(dispatch(Countdown, BotAction::Abort), Ok(Idle));
        // Execution cannot be aborted; it must settle through cooldown
        assert!(dispatch(Executing, BotAction::Abort).is_err());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        assert!(dispatch(Idle, BotAction::Execute).is_err());
        assert!(dispatch(Idle, BotAction::CooldownExpired).is_err());
        assert!(dispatch(Analyzing, BotAction::Execute).is_err());
        assert!(dispatch(Cooldown, BotAction::LockSignal).is_err());
        assert!(dispatch(Executing, BotAction::StartAnalysis).is_err());
    }

    #[test]
    fn test_adjacency_matches_dispatch() {
        // Every dispatch success must be a listed edge
        for &from in &ALL {
            for action in [
                BotAction::StartAnalysis,
                BotAction::LockSignal,
                BotAction::StartCountdown,
                BotAction::Execute,
                BotAction::FinishExecution,
                BotAction::CooldownExpired,
                BotAction::Abort,
            ] {
                if let Ok(to) = dispatch(from, action) {
                    assert!(can_transition_to(from, to), "{:?} -> {:?}", from, to);
                }
            }
        }
    }

    #[test]
    fn test_executing_only_exits_to_cooldown() {
        for &to in &ALL {
            let legal = can_transition_to(Executing, to);
            assert_eq!(legal, to == Cooldown);
        }
    }
}
