use crate::types::OptionType;
use statrs::distribution::{ContinuousCDF, Normal};

/// Closed-form Black-Scholes price of a European option.
///
/// C = S * Phi(d1) - K * e^{-rT} * Phi(d2)
/// P = K * e^{-rT} * Phi(-d2) - S * Phi(-d1)
///
/// where d1 = (ln(S/K) + (r + sigma^2/2) * T) / (sigma * sqrt(T)), d2 = d1 - sigma * sqrt(T).
///
/// Reference value for the Monte Carlo pricer.
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self { normal: Normal::standard() }
    }

    pub fn price(
        &self,
        option_type: OptionType,
        spot: f64,
        strike: f64,
        rate: f64,
        volatility: f64,
        time_to_expiry: f64,
    ) -> f64 {
        let discounted_strike = strike * (-rate * time_to_expiry).exp();
        let sigma_sqrt_t = volatility * time_to_expiry.sqrt();

        // No diffusion: the terminal price is the forward, so the value is the
        // discounted intrinsic value of the forward.
        if sigma_sqrt_t < 1e-12 {
            return match option_type {
                OptionType::Call => (spot - discounted_strike).max(0.0),
                OptionType::Put => (discounted_strike - spot).max(0.0),
            };
        }

        let d1 = ((spot / strike).ln() + (rate + 0.5 * volatility * volatility) * time_to_expiry)
            / sigma_sqrt_t;
        let d2 = d1 - sigma_sqrt_t;

        match option_type {
            OptionType::Call => spot * self.normal.cdf(d1) - discounted_strike * self.normal.cdf(d2),
            OptionType::Put => discounted_strike * self.normal.cdf(-d2) - spot * self.normal.cdf(-d1),
        }
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}
