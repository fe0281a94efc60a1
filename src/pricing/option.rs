use crate::engine::cancel::CancelToken;
use crate::engine::runner::SimulationRunner;
use crate::errors::{EngineError, EngineResult};
use crate::models::NormalSourceFactory;
use crate::types::{OptionPriceResult, OptionPricingRequest, OptionType};

/// European option pricing by risk-neutral Monte Carlo.
///
/// price = e^{-rT} * mean(payoff(S_T))
/// SE    = e^{-rT} * sd(payoff) / sqrt(N)
///
/// Paths are simulated with drift r, one step per trading day.
pub struct OptionPricer {
    runner: SimulationRunner,
}

/// Discounted payoff mean and its standard error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoffEstimate {
    pub price: f64,
    pub standard_error: f64,
}

impl OptionPricer {
    pub fn new(runner: SimulationRunner) -> Self {
        Self { runner: runner.without_path_sampling() }
    }

    pub fn price<F: NormalSourceFactory>(
        &self,
        request: &OptionPricingRequest,
        sources: &F,
        cancel: &CancelToken,
    ) -> EngineResult<OptionPriceResult> {
        request.validate()?;

        let spec = request.path_spec();
        let run = self.runner.run(&spec, sources, cancel)?;

        let discount = (-request.risk_free_rate * request.time_to_expiry_years).exp();
        let estimate = discounted_payoff(
            &run.terminal_values,
            request.strike_price,
            request.option_type,
            discount,
        )?;

        tracing::debug!(
            option_type = %request.option_type,
            price = estimate.price,
            standard_error = estimate.standard_error,
            simulations = spec.num_simulations,
            steps = spec.steps,
            "option priced"
        );

        Ok(OptionPriceResult {
            option_price: estimate.price,
            standard_error: estimate.standard_error,
            parameters: request.clone(),
            simulations_used: run.terminal_values.len(),
            steps: spec.steps,
        })
    }
}

#[inline]
pub fn payoff(option_type: OptionType, terminal: f64, strike: f64) -> f64 {
    match option_type {
        OptionType::Call => (terminal - strike).max(0.0),
        OptionType::Put => (strike - terminal).max(0.0),
    }
}

/// Welford mean/variance of the payoffs, then discounted.
pub fn discounted_payoff(
    terminal_values: &[f64],
    strike: f64,
    option_type: OptionType,
    discount: f64,
) -> EngineResult<PayoffEstimate> {
    if terminal_values.is_empty() {
        return Err(EngineError::invalid("terminalValues", "empty terminal value set"));
    }

    let mut count = 0.0_f64;
    let mut mean = 0.0_f64;
    let mut m2 = 0.0_f64;
    for &s_t in terminal_values {
        let x = payoff(option_type, s_t, strike);
        count += 1.0;
        let delta = x - mean;
        mean += delta / count;
        m2 += delta * (x - mean);
    }

    let variance = if count > 1.0 { m2 / (count - 1.0) } else { 0.0 };
    let estimate = PayoffEstimate {
        price: discount * mean,
        standard_error: discount * (variance / count).sqrt(),
    };

    if !(estimate.price.is_finite() && estimate.standard_error.is_finite()) {
        return Err(EngineError::NumericalInstability(format!(
            "option estimate {} +/- {} is not finite",
            estimate.price, estimate.standard_error
        )));
    }
    Ok(estimate)
}
