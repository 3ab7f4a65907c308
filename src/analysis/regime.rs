//! Regime detection via the Hurst exponent.
//!
//! Uses a rescaled-range (R/S) estimate over log returns: for a set of
//! window sizes, average R/S per window, then take the slope of
//! log(R/S) against log(window) as the exponent.

use statrs::statistics::Statistics;

use crate::models::Regime;

/// Minimum samples for a meaningful R/S estimate.
const MIN_SAMPLES: usize = 20;

/// Smallest R/S window.
const MIN_WINDOW: usize = 8;

/// Hurst exponent estimate in [0, 1].
///
/// Returns 0.5 (the random-walk default) when fewer than 20 samples are
/// available or the series is degenerate. Never errors on short input.
pub fn hurst_exponent(prices: &[f64]) -> f64 {
    if prices.len() < MIN_SAMPLES {
        return 0.5;
    }

    let returns: Vec<f64> = prices
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0)
        .map(|w| (w[1] / w[0]).ln())
        .collect();

    if returns.len() < MIN_SAMPLES - 1 {
        return 0.5;
    }

    // Window sizes from MIN_WINDOW up to half the series, geometric steps.
    let mut window_sizes = Vec::new();
    let mut n = MIN_WINDOW;
    while n <= returns.len() / 2 {
        window_sizes.push(n);
        n = (n as f64 * 1.5).ceil() as usize;
    }
    if window_sizes.len() < 2 {
        return 0.5;
    }

    let mut log_n = Vec::new();
    let mut log_rs = Vec::new();

    for &size in &window_sizes {
        let mut rs_values = Vec::new();

        for chunk in returns.chunks_exact(size) {
            let mean = chunk.to_vec().mean();
            let std_dev = chunk.to_vec().std_dev();
            if !std_dev.is_finite() || std_dev <= 0.0 {
                continue;
            }

            // Range of cumulative deviations from the chunk mean
            let mut cum = 0.0;
            let mut max = f64::MIN;
            let mut min = f64::MAX;
            for &r in chunk {
                cum += r - mean;
                max = max.max(cum);
                min = min.min(cum);
            }

            let range = max - min;
            if range > 0.0 {
                rs_values.push(range / std_dev);
            }
        }

        if !rs_values.is_empty() {
            let avg_rs = rs_values.to_vec().mean();
            log_n.push((size as f64).ln());
            log_rs.push(avg_rs.ln());
        }
    }

    if log_n.len() < 2 {
        return 0.5;
    }

    let h = slope(&log_n, &log_rs);
    if h.is_finite() {
        h.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Classify the price regime from a Hurst exponent.
pub fn detect_regime(h: f64) -> Regime {
    if h < 0.45 {
        Regime::MeanReversion
    } else if h > 0.55 {
        Regime::Trending
    } else {
        Regime::RandomWalk
    }
}

/// Least-squares slope of y on x.
fn slope(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        num += (xi - x_mean) * (yi - y_mean);
        den += (xi - x_mean) * (xi - x_mean);
    }

    if den == 0.0 {
        return f64::NAN;
    }
    num / den
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_defaults_to_random_walk() {
        assert_eq!(hurst_exponent(&[]), 0.5);
        assert_eq!(hurst_exponent(&[100.0; 10]), 0.5);

        let prices: Vec<f64> = (0..19).map(|i| 100.0 + i as f64).collect();
        assert_eq!(hurst_exponent(&prices), 0.5);
    }

    #[test]
    fn test_oscillating_series_is_anti_persistent() {
        // Strict alternation around 100 is the most mean-reverting series
        // possible; its exponent should sit well below the random walk.
        let prices: Vec<f64> = (0..200)
            .map(|i| if i % 2 == 0 { 100.0 } else { 102.0 })
            .collect();

        let h = hurst_exponent(&prices);
        assert!(h < 0.45, "expected anti-persistent, got h={}", h);
        assert_eq!(detect_regime(h), Regime::MeanReversion);
    }

    #[test]
    fn test_slow_drift_is_persistent() {
        // Returns vary on a slow cycle, so consecutive returns are highly
        // correlated and cumulative deviations grow faster than sqrt(n).
        let mut prices = vec![100.0];
        for i in 0..256 {
            let r = 0.01 + 0.009 * (i as f64 / 40.0).sin();
            let last = *prices.last().unwrap();
            prices.push(last * (1.0 + r));
        }

        let h = hurst_exponent(&prices);
        assert!(h > 0.55, "expected persistent, got h={}", h);
        assert_eq!(detect_regime(h), Regime::Trending);
    }

    #[test]
    fn test_result_always_in_unit_interval() {
        let prices: Vec<f64> = (0..300)
            .map(|i| 100.0 * (1.0 + 0.02 * ((i * 7919) as f64).sin()))
            .collect();
        let h = hurst_exponent(&prices);
        assert!((0.0..=1.0).contains(&h));
    }

    #[test]
    fn test_regime_thresholds() {
        assert_eq!(detect_regime(0.30), Regime::MeanReversion);
        assert_eq!(detect_regime(0.45), Regime::RandomWalk);
        assert_eq!(detect_regime(0.50), Regime::RandomWalk);
        assert_eq!(detect_regime(0.55), Regime::RandomWalk);
        assert_eq!(detect_regime(0.70), Regime::Trending);
    }
}
