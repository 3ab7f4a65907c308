//! Injected time and id sources.
//!
//! Signal generation and the ledger never call `Utc::now()` or
//! `Uuid::new_v4()` directly; they take a [`Stamper`] so the core stays
//! deterministic under test and only the outer layer supplies real
//! time and randomness.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of timestamps and unique ids.
pub trait Stamper: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn next_id(&self) -> Uuid;
}

/// Production stamper: wall clock and random v4 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStamper;

impl Stamper for SystemStamper {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic stamper: a fixed instant and sequential ids.
#[derive(Debug)]
pub struct FixedStamper {
    instant: DateTime<Utc>,
    counter: std::sync::atomic::AtomicU64,
}

impl FixedStamper {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            counter: std::sync::atomic::AtomicU64::new(1),
        }
    }

    /// Fixed at the unix epoch; handy default for tests.
    pub fn epoch() -> Self {
        Self::new(DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_else(Utc::now))
    }
}

impl Stamper for FixedStamper {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }

    fn next_id(&self) -> Uuid {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Uuid::from_u128(n as u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_stamper_is_deterministic() {
        let stamper = FixedStamper::epoch();
        assert_eq!(stamper.now(), stamper.now());
        assert_ne!(stamper.next_id(), stamper.next_id());

        let a = FixedStamper::epoch();
        let b = FixedStamper::epoch();
        assert_eq!(a.next_id(), b.next_id());
    }
}
