//! Ornstein-Uhlenbeck parameter estimation and the z-score entry signal.
//!
//! Fit is a lag-1 regression of the discretized process
//! `x[t+1] = a + phi * x[t] + e`, mapped back to continuous-time
//! parameters: mu = a / (1 - phi), theta = -ln(phi), and sigma taken as
//! the stationary standard deviation of the fitted process.

use statrs::statistics::Statistics;

use crate::models::Direction;

/// Z-score magnitude beyond which the mean-reversion entry triggers.
const ENTRY_Z: f64 = 2.0;

/// Fitted parameters of a mean-reverting process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OuParams {
    /// Long-run mean the process reverts toward
    pub mu: f64,

    /// Mean-reversion speed, >= 0 (0 means no detectable reversion)
    pub theta: f64,

    /// Stationary standard deviation around the mean, >= 0
    pub sigma: f64,
}

/// Mean-reversion entry signal derived from the OU fit.
///
/// The dead zone (|z| < 2) is a first-class value: `direction` is `None`
/// and callers fall through to the trend vote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OuSignal {
    pub z_score: f64,
    pub direction: Option<Direction>,
}

/// Lag-1 regression fit of an OU process over a price series.
///
/// Degenerate input (short series, zero variance, or a non-reverting
/// phi >= 1) falls back to the sample mean/std with theta = 0 rather
/// than erroring.
pub fn estimate_ou_parameters(prices: &[f64]) -> OuParams {
    if prices.len() < 3 {
        return fallback(prices);
    }

    let x = &prices[..prices.len() - 1];
    let y = &prices[1..];
    let n = x.len() as f64;

    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        cov += (xi - x_mean) * (yi - y_mean);
        var += (xi - x_mean) * (xi - x_mean);
    }

    if var <= f64::EPSILON {
        return fallback(prices);
    }

    let phi = cov / var;
    if !phi.is_finite() || phi >= 1.0 || phi <= 0.0 {
        // No usable reversion: phi >= 1 is a random walk or trend,
        // phi <= 0 flips sign every step faster than the model allows.
        return fallback(prices);
    }

    let a = y_mean - phi * x_mean;
    let mu = a / (1.0 - phi);
    let theta = (-phi.ln()).max(0.0);

    // Residual variance, then the stationary variance sigma^2 / (1 - phi^2)
    let mut resid_sq = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let e = yi - (a + phi * xi);
        resid_sq += e * e;
    }
    let resid_var = resid_sq / n;
    let stationary = (resid_var / (1.0 - phi * phi)).sqrt();

    let sigma = if stationary.is_finite() && stationary > 0.0 {
        stationary
    } else {
        prices.to_vec().std_dev().max(0.0)
    };

    OuParams { mu, theta, sigma }
}

/// Z-score signal: long when stretched far below the mean, short far above.
pub fn generate_ou_signal(price: f64, params: &OuParams) -> OuSignal {
    if params.sigma <= 0.0 || !params.sigma.is_finite() {
        return OuSignal {
            z_score: 0.0,
            direction: None,
        };
    }

    let z = (price - params.mu) / params.sigma;
    let direction = if z <= -ENTRY_Z {
        Some(Direction::Long)
    } else if z >= ENTRY_Z {
        Some(Direction::Short)
    } else {
        None
    };

    OuSignal {
        z_score: z,
        direction,
    }
}

fn fallback(prices: &[f64]) -> OuParams {
    if prices.is_empty() {
        return OuParams {
            mu: 0.0,
            theta: 0.0,
            sigma: 0.0,
        };
    }
    let mu = prices.iter().sum::<f64>() / prices.len() as f64;
    let sigma = if prices.len() > 1 {
        prices.to_vec().std_dev()
    } else {
        0.0
    };
    OuParams {
        mu,
        theta: 0.0,
        sigma: sigma.max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic mean-reverting series around 100.
    fn reverting_series() -> Vec<f64> {
        let mut prices = vec![104.0];
        for i in 0..200 {
            let last = *prices.last().unwrap();
            // Pull halfway back to 100 plus a small deterministic wobble
            let next = 100.0 + 0.5 * (last - 100.0) + ((i * 31) as f64).sin();
            prices.push(next);
        }
        prices
    }

    #[test]
    fn test_fit_recovers_mean() {
        let params = estimate_ou_parameters(&reverting_series());
        assert!((params.mu - 100.0).abs() < 1.0, "mu={}", params.mu);
        assert!(params.theta > 0.0);
        assert!(params.sigma > 0.0);
    }

    #[test]
    fn test_degenerate_input_falls_back() {
        let params = estimate_ou_parameters(&[]);
        assert_eq!(params.theta, 0.0);
        assert_eq!(params.sigma, 0.0);

        let params = estimate_ou_parameters(&[100.0, 100.0, 100.0, 100.0]);
        assert_eq!(params.mu, 100.0);
        assert_eq!(params.theta, 0.0);
    }

    #[test]
    fn test_dead_zone_is_a_value() {
        let params = OuParams {
            mu: 100.0,
            theta: 0.7,
            sigma: 2.0,
        };

        let signal = generate_ou_signal(101.0, &params);
        assert_eq!(signal.direction, None);
        assert!((signal.z_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_stretched_price_triggers_entry() {
        let params = OuParams {
            mu: 100.0,
            theta: 0.7,
            sigma: 2.0,
        };

        let long = generate_ou_signal(95.0, &params); // z = -2.5
        assert_eq!(long.direction, Some(Direction::Long));

        let short = generate_ou_signal(105.0, &params); // z = 2.5
        assert_eq!(short.direction, Some(Direction::Short));

        // Exactly at the threshold counts
        let edge = generate_ou_signal(96.0, &params); // z = -2.0
        assert_eq!(edge.direction, Some(Direction::Long));
    }

    #[test]
    fn test_zero_sigma_yields_no_direction() {
        let params = OuParams {
            mu: 100.0,
            theta: 0.5,
            sigma: 0.0,
        };
        let signal = generate_ou_signal(150.0, &params);
        assert_eq!(signal.direction, None);
        assert_eq!(signal.z_score, 0.0);
    }
}
