use crate::errors::{EngineError, EngineResult};
use smallvec::SmallVec;

/// Distributional risk statistics over a set of simulated terminal prices.
///
/// Conventions (all on the ascending-sorted array S of length n):
///   median        = S[floor(n/2)]                      (no interpolation)
///   percentile(p) = S[clamp(floor(p*n), 0, n-1)]
///   VaR           = current - S[varIndex], varIndex = clamp(floor((1-c)*n), 0, n-1)
///   CVaR          = mean(current - S[i]) for i in 0..=varIndex
///
/// VaR and CVaR are loss magnitudes in price units: positive means the tail
/// outcome sits below the current price.
///
/// Pure functions. No randomness, no allocation beyond the owned input.

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Percentiles {
    pub p1: f64,
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// VaR/CVaR at one confidence level.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TailRisk {
    pub confidence_level: f64,
    /// Terminal price at the VaR index.
    pub threshold: f64,
    pub value_at_risk: f64,
    #[serde(rename = "conditionalVaR")]
    pub conditional_var: f64,
    /// VaR as a percentage of the current price.
    pub loss_percentage: f64,
}

/// Immutable snapshot built once from a terminal-value set.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskReport {
    pub mean: f64,
    pub median: f64,
    pub percentiles: Percentiles,
    pub value_at_risk: f64,
    pub conditional_var: f64,
    pub probability_of_profit: f64,
    pub probability_of_loss: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Sample standard deviation (n - 1 denominator, 0 for a single value).
    pub std_dev: f64,
    /// (mean - current) / current
    pub expected_return: f64,
    /// (mean / current)^(1 / T) - 1, T in years
    pub annualized_return: f64,
    pub tail_risk: SmallVec<[TailRisk; 4]>,
    pub sample_size: usize,
}

/// Build a [`RiskReport`] from terminal prices.
///
/// `additional_levels` yields one extra [`TailRisk`] entry each, after the
/// primary `confidence_level` entry. `horizon_years` only feeds the annualized return.
pub fn compute_risk_report(
    mut terminal_values: Vec<f64>,
    current_price: f64,
    confidence_level: f64,
    additional_levels: &[f64],
    horizon_years: f64,
) -> EngineResult<RiskReport> {
    if !(horizon_years.is_finite() && horizon_years > 0.0) {
        return Err(EngineError::invalid(
            "horizonYears",
            format!("must be > 0, got {horizon_years}"),
        ));
    }

    let n = terminal_values.len();
    if n == 0 {
        return Err(EngineError::invalid("terminalValues", "empty terminal value set"));
    }
    if let Some(bad) = terminal_values.iter().find(|v| !v.is_finite()) {
        return Err(EngineError::NumericalInstability(format!(
            "terminal value set contains {bad}"
        )));
    }

    terminal_values.sort_unstable_by(f64::total_cmp);
    let s = &terminal_values;
    let nf = n as f64;

    let mean = running_mean(s);

    // Two-pass variance
    let std_dev = if n > 1 {
        let ss: f64 = s.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (nf - 1.0)).sqrt()
    } else {
        0.0
    };

    let percentiles = Percentiles {
        p1: percentile(s, 0.01),
        p5: percentile(s, 0.05),
        p10: percentile(s, 0.1),
        p25: percentile(s, 0.25),
        p50: percentile(s, 0.5),
        p75: percentile(s, 0.75),
        p90: percentile(s, 0.9),
        p95: percentile(s, 0.95),
        p99: percentile(s, 0.99),
    };

    let annualized_return = (mean / current_price).powf(1.0 / horizon_years) - 1.0;

    let primary = tail_risk(s, current_price, confidence_level);
    let mut tail: SmallVec<[TailRisk; 4]> = SmallVec::new();
    tail.push(primary);
    for &level in additional_levels {
        tail.push(tail_risk(s, current_price, level));
    }

    let profitable = s.iter().filter(|&&v| v > current_price).count();
    let losing = s.iter().filter(|&&v| v < current_price).count();

    Ok(RiskReport {
        mean,
        median: s[n / 2],
        percentiles,
        value_at_risk: primary.value_at_risk,
        conditional_var: primary.conditional_var,
        probability_of_profit: profitable as f64 / nf,
        probability_of_loss: losing as f64 / nf,
        min_price: s[0],
        max_price: s[n - 1],
        std_dev,
        expected_return: (mean - current_price) / current_price,
        annualized_return,
        tail_risk: tail,
        sample_size: n,
    })
}

/// Welford running mean. Each update adds a bounded correction instead of
/// accumulating one large sum, so precision holds for large path counts.
#[inline]
fn running_mean(values: &[f64]) -> f64 {
    let mut mean = 0.0_f64;
    for (i, &v) in values.iter().enumerate() {
        mean += (v - mean) / (i + 1) as f64;
    }
    mean
}

/// `S[clamp(floor(p*n), 0, n-1)]` on an ascending, non-empty slice.
#[inline]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    sorted[clamped_index(p * sorted.len() as f64, sorted.len())]
}

/// VaR/CVaR at `confidence_level` on an ascending, non-empty slice.
pub fn tail_risk(sorted: &[f64], current_price: f64, confidence_level: f64) -> TailRisk {
    let var_index = clamped_index((1.0 - confidence_level) * sorted.len() as f64, sorted.len());
    let threshold = sorted[var_index];
    let value_at_risk = current_price - threshold;

    let tail_loss: f64 = sorted[..=var_index].iter().map(|v| current_price - v).sum();
    let conditional_var = tail_loss / (var_index + 1) as f64;

    TailRisk {
        confidence_level,
        threshold,
        value_at_risk,
        conditional_var,
        loss_percentage: value_at_risk / current_price * 100.0,
    }
}

#[inline]
fn clamped_index(raw: f64, n: usize) -> usize {
    // `as usize` truncates toward zero and saturates negatives to 0
    (raw.floor() as usize).min(n - 1)
}
