//! Signal model: direction, regime, risk tiering, and the full trade setup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timeframe;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short; used for direction-aware price offsets.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

/// Price behavior regime classified from the Hurst exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    MeanReversion,
    RandomWalk,
    Trending,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::MeanReversion => "MEAN_REVERSION",
            Regime::RandomWalk => "RANDOM_WALK",
            Regime::Trending => "TRENDING",
        }
    }
}

/// Risk tier implied by the recommended leverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Extreme => "EXTREME",
        }
    }
}

/// A complete, risk-bounded trade setup produced by the signal generator.
///
/// Immutable once created: it is either consumed into a live position or
/// discarded. Invariant: |take_profit - entry| == |entry - stop_loss| * rrr.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSetup {
    /// Unique signal identifier (from the injected id source)
    pub id: Uuid,

    /// Asset symbol the setup applies to
    pub asset: String,

    pub direction: Direction,

    pub entry_price: f64,

    pub stop_loss_price: f64,

    pub take_profit_price: f64,

    /// Recommended leverage, clamped to the configured [min, max]
    pub leverage: f64,

    /// Reward multiple relative to the stop distance
    pub risk_reward_ratio: f64,

    /// Confidence in [0, 100]
    pub confidence_score: f64,

    pub risk_level: RiskLevel,

    /// Human-readable summary of the top contributing factors
    pub rationale: String,

    /// Regime classification backing the setup, when history was available
    #[serde(default)]
    pub regime: Option<Regime>,

    /// Hurst exponent estimate backing the regime, when available
    #[serde(default)]
    pub hurst_exponent: Option<f64>,

    pub timeframe: Timeframe,

    /// When the setup was derived (from the injected clock)
    pub generated_at: DateTime<Utc>,
}

impl SignalSetup {
    /// Distance from entry to stop in price units.
    pub fn stop_distance(&self) -> f64 {
        (self.entry_price - self.stop_loss_price).abs()
    }

    /// Stop distance as a fraction of entry price.
    pub fn stop_distance_pct(&self) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        self.stop_distance() / self.entry_price
    }

    /// Verify the reward-multiple invariant within floating-point tolerance.
    pub fn risk_reward_consistent(&self) -> bool {
        let reward = (self.take_profit_price - self.entry_price).abs();
        let risk = self.stop_distance();
        (reward - risk * self.risk_reward_ratio).abs() <= 1e-6 * self.entry_price.max(1.0)
    }
}
