//! Signal derivation: leverage, Chandelier stop, take-profit, direction
//! vote, confidence scoring, and rationale assembly.

use tracing::debug;

use crate::analysis::{
    atr_from_volatility, detect_regime, estimate_ou_parameters, generate_ou_signal, hurst_exponent,
    scale_for_timeframe, OuSignal,
};
use crate::clock::Stamper;
use crate::models::{Direction, MarketConditions, Regime, RiskLevel, SignalSetup, Timeframe};

use super::SignalEngineConfig;

/// Vote weights for the trend direction vote.
const SENTIMENT_WEIGHT: f64 = 0.4;
const RSI_WEIGHT: f64 = 0.3;
const EMA_WEIGHT: f64 = 0.3;

/// EMA distance treated as a full-strength trend (5% from the 200-EMA).
const EMA_FULL_STRENGTH: f64 = 0.05;

/// Minimum history length before the Hurst/OU analyzers engage.
const MIN_HISTORY: usize = 20;

/// Volatility-inverse leverage recommendation.
///
/// raw = 1 / (dailyVol * safetyFactor), with the volatility first scaled
/// to the timeframe; clamped to [min, max] and rounded to the nearest 0.5.
/// Non-positive volatility recommends the minimum.
pub fn leverage(
    daily_volatility: f64,
    safety_factor: f64,
    max_leverage: f64,
    min_leverage: f64,
    timeframe: Timeframe,
) -> f64 {
    if daily_volatility <= 0.0 || !daily_volatility.is_finite() {
        return min_leverage;
    }

    let scaled_vol = scale_for_timeframe(daily_volatility, timeframe);
    let raw = 1.0 / (scaled_vol * safety_factor.max(f64::EPSILON));
    let clamped = raw.clamp(min_leverage, max_leverage);
    let rounded = (clamped * 2.0).round() / 2.0;

    rounded.clamp(min_leverage, max_leverage)
}

/// Chandelier Exit stop: entry -/+ scaledAtr * multiplier by direction.
pub fn stop_loss(
    entry: f64,
    atr: f64,
    direction: Direction,
    atr_multiplier: f64,
    timeframe: Timeframe,
) -> f64 {
    let offset = scale_for_timeframe(atr.max(0.0), timeframe) * atr_multiplier;
    match direction {
        // Floor keeps an absurd ATR from producing a non-positive stop
        Direction::Long => (entry - offset).max(entry * 0.01),
        Direction::Short => entry + offset,
    }
}

/// Take-profit at a reward multiple of the stop distance.
pub fn take_profit(entry: f64, stop: f64, direction: Direction, risk_reward_ratio: f64) -> f64 {
    let risk = (entry - stop).abs();
    entry + direction.sign() * risk * risk_reward_ratio
}

/// Risk tier implied by leverage.
pub fn risk_level(leverage: f64) -> RiskLevel {
    if leverage <= 3.0 {
        RiskLevel::Low
    } else if leverage <= 7.0 {
        RiskLevel::Medium
    } else if leverage <= 15.0 {
        RiskLevel::High
    } else {
        RiskLevel::Extreme
    }
}

/// Signal generator: pure orchestration over the analyzers.
///
/// Deterministic given (market, config, stamper); holds no mutable state.
pub struct SignalGenerator {
    config: SignalEngineConfig,
}

impl SignalGenerator {
    pub fn new(config: SignalEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalEngineConfig {
        &self.config
    }

    /// Derive a complete trade setup from a market snapshot.
    ///
    /// Bad inputs degrade to a minimum-leverage, zero-confidence setup;
    /// this never errors.
    pub fn generate(&self, market: &MarketConditions, stamper: &dyn Stamper) -> SignalSetup {
        let (market, warnings) = market.sanitized();
        if !warnings.is_empty() {
            debug!(symbol = %market.symbol, ?warnings, "degraded market inputs");
        }

        if !market.is_usable() {
            return self.degraded_setup(&market, stamper);
        }

        // Regime classification only engages with enough history
        let (hurst, regime) = if market.historical_prices.len() >= MIN_HISTORY {
            let h = hurst_exponent(&market.historical_prices);
            (Some(h), Some(detect_regime(h)))
        } else {
            (None, None)
        };
        let effective_regime = regime.unwrap_or(Regime::RandomWalk);

        // OU stretch signal is only meaningful in a mean-reverting regime
        let ou_signal = if effective_regime == Regime::MeanReversion {
            let params = estimate_ou_parameters(&market.historical_prices);
            Some(generate_ou_signal(market.current_price, &params))
        } else {
            None
        };

        let direction = self.direction(&market, effective_regime, ou_signal.as_ref());
        let lev = leverage(
            market.daily_volatility,
            self.config.safety_factor,
            self.config.max_leverage,
            self.config.min_leverage,
            self.config.timeframe,
        );

        let atr = if market.atr > 0.0 {
            market.atr
        } else {
            atr_from_volatility(market.current_price, market.daily_volatility)
        };

        let entry = market.current_price;
        let stop = stop_loss(
            entry,
            atr,
            direction,
            self.config.atr_multiplier,
            self.config.timeframe,
        );
        let target = take_profit(entry, stop, direction, self.config.min_risk_reward_ratio);

        let confidence = self.confidence(&market, hurst.unwrap_or(0.5));

        debug!(
            symbol = %market.symbol,
            direction = direction.as_str(),
            leverage = lev,
            regime = effective_regime.as_str(),
            confidence,
            "signal derived"
        );

        SignalSetup {
            id: stamper.next_id(),
            asset: market.symbol.clone(),
            direction,
            entry_price: entry,
            stop_loss_price: stop,
            take_profit_price: target,
            leverage: lev,
            risk_reward_ratio: self.config.min_risk_reward_ratio,
            confidence_score: confidence,
            risk_level: risk_level(lev),
            rationale: self.rationale(&market, direction),
            regime,
            hurst_exponent: hurst,
            timeframe: self.config.timeframe,
            generated_at: stamper.now(),
        }
    }

    /// Trade direction: in a mean-reverting regime the OU z-score decides
    /// (its dead zone falls through); otherwise a weighted vote over
    /// sentiment (40%), contrarian RSI (30%), and EMA position (30%).
    /// Ties resolve long.
    fn direction(
        &self,
        market: &MarketConditions,
        regime: Regime,
        ou: Option<&OuSignal>,
    ) -> Direction {
        if regime == Regime::MeanReversion {
            if let Some(dir) = ou.and_then(|s| s.direction) {
                return dir;
            }
        }

        let mut score = 0.0;
        if let Some(s) = market.sentiment_score {
            score += SENTIMENT_WEIGHT * s;
        }
        if let Some(rsi) = market.rsi {
            // Contrarian: oversold votes long, overbought votes short
            score += RSI_WEIGHT * ((50.0 - rsi) / 50.0);
        }
        if let Some(strength) = ema_strength(market) {
            score += EMA_WEIGHT * strength;
        }

        if score >= 0.0 {
            Direction::Long
        } else {
            Direction::Short
        }
    }

    /// Confidence score in [0, 100].
    ///
    /// Base 50, adjusted by sentiment magnitude (up to 15), RSI extremity
    /// (up to 10), EMA trend strength (up to 10), and regime clarity, the
    /// Hurst distance from 0.5 (up to 15).
    fn confidence(&self, market: &MarketConditions, hurst: f64) -> f64 {
        let mut score = 50.0;

        if let Some(s) = market.sentiment_score {
            score += s.abs() * 15.0;
        }
        if let Some(rsi) = market.rsi {
            score += ((rsi - 50.0).abs() / 50.0) * 10.0;
        }
        if let Some(strength) = ema_strength(market) {
            score += strength.abs() * 10.0;
        }
        score += ((hurst - 0.5).abs() / 0.5) * 15.0;

        score.clamp(0.0, 100.0)
    }

    /// Rank contributing factors and join the top three into a summary.
    fn rationale(&self, market: &MarketConditions, direction: Direction) -> String {
        let mut factors: Vec<(f64, String)> = Vec::new();

        if let Some(s) = market.sentiment_score {
            let tone = if s >= 0.0 { "bullish" } else { "bearish" };
            if s.abs() >= 0.5 {
                factors.push((s.abs(), format!("strong {} sentiment", tone)));
            } else if s.abs() >= 0.2 {
                factors.push((s.abs(), format!("mild {} sentiment", tone)));
            }
        }

        if let Some(rsi) = market.rsi {
            if rsi <= 35.0 {
                factors.push(((50.0 - rsi) / 50.0, format!("RSI {:.0} oversold", rsi)));
            } else if rsi >= 65.0 {
                factors.push(((rsi - 50.0) / 50.0, format!("RSI {:.0} overbought", rsi)));
            }
        }

        if let Some(strength) = ema_strength(market) {
            if strength.abs() >= 0.2 {
                let side = if strength > 0.0 { "above" } else { "below" };
                factors.push((strength.abs(), format!("price {} the 200-EMA", side)));
            }
        }

        if market.daily_volatility >= 0.06 {
            factors.push((
                (market.daily_volatility / 0.12).min(1.0),
                "elevated volatility".to_string(),
            ));
        } else if market.daily_volatility > 0.0 && market.daily_volatility <= 0.015 {
            factors.push((0.3, "muted volatility".to_string()));
        }

        factors.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        if factors.is_empty() {
            return format!(
                "{} bias from aggregate trend momentum",
                direction.as_str()
            );
        }

        let top: Vec<String> = factors.into_iter().take(3).map(|(_, label)| label).collect();
        format!("{} bias: {}", direction.as_str(), top.join(", "))
    }

    /// Setup emitted when the snapshot cannot back a real signal.
    fn degraded_setup(&self, market: &MarketConditions, stamper: &dyn Stamper) -> SignalSetup {
        let entry = market.current_price.max(0.0);
        SignalSetup {
            id: stamper.next_id(),
            asset: market.symbol.clone(),
            direction: Direction::Long,
            entry_price: entry,
            stop_loss_price: entry,
            take_profit_price: entry,
            leverage: self.config.min_leverage,
            risk_reward_ratio: self.config.min_risk_reward_ratio,
            confidence_score: 0.0,
            risk_level: risk_level(self.config.min_leverage),
            rationale: "insufficient market data for a signal".to_string(),
            regime: None,
            hurst_exponent: None,
            timeframe: self.config.timeframe,
            generated_at: stamper.now(),
        }
    }
}

/// Relative distance from the 200-EMA, clamped to [-1, 1] at 5% away.
fn ema_strength(market: &MarketConditions) -> Option<f64> {
    let ema = market.ema200?;
    if ema <= 0.0 {
        return None;
    }
    Some(((market.current_price - ema) / (ema * EMA_FULL_STRENGTH)).clamp(-1.0, 1.0))
}
