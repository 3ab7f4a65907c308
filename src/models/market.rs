//! Market snapshot model and timeframe scaling.

use serde::{Deserialize, Serialize};

/// Candle timeframe for signal generation.
///
/// Volatility and ATR inputs are assumed to be daily figures; shorter
/// timeframes scale them down by square-root-of-time relative to the
/// 1-day baseline (1d = 1.0, 1h ≈ 0.204, 15m ≈ 0.102).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[default]
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// Bar duration in minutes.
    pub fn minutes(&self) -> f64 {
        match self {
            Timeframe::M1 => 1.0,
            Timeframe::M5 => 5.0,
            Timeframe::M15 => 15.0,
            Timeframe::H1 => 60.0,
            Timeframe::H4 => 240.0,
            Timeframe::D1 => 1440.0,
        }
    }

    /// Square-root-of-time multiplier relative to the 1-day baseline.
    ///
    /// Shorter timeframes scale volatility and ATR down, never up.
    pub fn scale(&self) -> f64 {
        (self.minutes() / 1440.0).sqrt().min(1.0)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" | "d" => Ok(Timeframe::D1),
            other => Err(format!("unknown timeframe: {}", other)),
        }
    }
}

/// Immutable snapshot of market conditions for one asset.
///
/// This is the single input to signal generation; the core never fetches
/// it itself, the price feed collaborator supplies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConditions {
    /// Asset symbol (e.g., "BTCUSDT")
    pub symbol: String,

    /// Last traded price, must be positive to be usable
    pub current_price: f64,

    /// Daily volatility as a decimal fraction (e.g., 0.04 = 4%)
    pub daily_volatility: f64,

    /// Average True Range in price units (daily)
    pub atr: f64,

    /// 200-period EMA, if available
    #[serde(default)]
    pub ema200: Option<f64>,

    /// RSI reading in [0, 100], if available
    #[serde(default)]
    pub rsi: Option<f64>,

    /// Aggregate sentiment score in [-1, 1], if available
    #[serde(default)]
    pub sentiment_score: Option<f64>,

    /// Recent close prices, oldest first; feeds the Hurst/OU analyzers
    #[serde(default)]
    pub historical_prices: Vec<f64>,
}

impl MarketConditions {
    pub fn new(
        symbol: impl Into<String>,
        current_price: f64,
        daily_volatility: f64,
        atr: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            current_price,
            daily_volatility,
            atr,
            ema200: None,
            rsi: None,
            sentiment_score: None,
            historical_prices: Vec::new(),
        }
    }

    /// Whether the snapshot carries enough valid data to derive a signal.
    pub fn is_usable(&self) -> bool {
        self.current_price > 0.0 && self.current_price.is_finite()
    }

    /// Clamp out-of-range optional inputs to their documented domains.
    ///
    /// Returns the sanitized snapshot plus one warning per degraded field.
    /// Bad inputs degrade, they never error.
    pub fn sanitized(&self) -> (Self, Vec<String>) {
        let mut out = self.clone();
        let mut warnings = Vec::new();

        if out.daily_volatility < 0.0 || !out.daily_volatility.is_finite() {
            warnings.push(format!(
                "daily_volatility {} out of range, clamped to 0",
                out.daily_volatility
            ));
            out.daily_volatility = 0.0;
        }
        if out.atr < 0.0 || !out.atr.is_finite() {
            warnings.push(format!("atr {} out of range, clamped to 0", out.atr));
            out.atr = 0.0;
        }
        if let Some(rsi) = out.rsi {
            if !(0.0..=100.0).contains(&rsi) || !rsi.is_finite() {
                warnings.push(format!("rsi {} out of [0, 100], dropped", rsi));
                out.rsi = None;
            }
        }
        if let Some(s) = out.sentiment_score {
            if !(-1.0..=1.0).contains(&s) || !s.is_finite() {
                warnings.push(format!("sentiment_score {} out of [-1, 1], clamped", s));
                out.sentiment_score = Some(if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 });
            }
        }
        if let Some(ema) = out.ema200 {
            if ema <= 0.0 || !ema.is_finite() {
                warnings.push(format!("ema200 {} not positive, dropped", ema));
                out.ema200 = None;
            }
        }

        (out, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_scale() {
        assert!((Timeframe::D1.scale() - 1.0).abs() < 1e-12);
        assert!((Timeframe::H1.scale() - 0.2041).abs() < 0.001);
        assert!((Timeframe::M15.scale() - 0.1021).abs() < 0.001);

        // Scaling never exceeds the daily baseline
        for tf in [
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
        ] {
            assert!(tf.scale() <= 1.0);
            assert!(tf.scale() > 0.0);
        }
    }

    #[test]
    fn test_sanitize_clamps_bad_inputs() {
        let mut market = MarketConditions::new("BTCUSDT", 100_000.0, -0.5, 2000.0);
        market.rsi = Some(140.0);
        market.sentiment_score = Some(3.0);

        let (clean, warnings) = market.sanitized();

        assert_eq!(clean.daily_volatility, 0.0);
        assert_eq!(clean.rsi, None);
        assert_eq!(clean.sentiment_score, Some(1.0));
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_usable_requires_positive_price() {
        let market = MarketConditions::new("BTCUSDT", 0.0, 0.04, 2000.0);
        assert!(!market.is_usable());

        let market = MarketConditions::new("BTCUSDT", 100_000.0, 0.04, 2000.0);
        assert!(market.is_usable());
    }
}
