use crate::errors::{EngineError, EngineResult};
use crate::models::NormalSource;

/// Trading-day convention used for every step length.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Everything a path needs, derived once from a validated request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSpec {
    pub initial_price: f64,
    /// Annualized drift (the risk-free rate for both simulation and pricing).
    pub drift: f64,
    pub volatility: f64,
    pub steps: usize,
    /// Step length in years.
    pub dt: f64,
    pub num_simulations: usize,
}

impl PathSpec {
    #[inline]
    pub fn horizon_years(&self) -> f64 {
        self.steps as f64 * self.dt
    }

    /// Total number of GBM updates this spec asks for.
    #[inline]
    pub fn path_steps(&self) -> u128 {
        self.num_simulations as u128 * self.steps as u128
    }

    /// Price every path converges to as volatility goes to zero.
    #[inline]
    pub fn deterministic_terminal(&self) -> f64 {
        self.initial_price * (self.drift * self.horizon_years()).exp()
    }
}

/// Log-Euler GBM stepper.
///
/// S_{t+dt} = S_t * exp((mu - sigma^2/2) * dt + sigma * sqrt(dt) * z)
///
/// Both exponent coefficients are precomputed. With sigma = 0 the diffusion
/// coefficient is exactly zero and the update is pure drift.
#[derive(Debug, Clone, Copy)]
pub struct GbmStepper {
    log_drift: f64,
    diffusion: f64,
    steps: usize,
}

impl GbmStepper {
    pub fn new(spec: &PathSpec) -> Self {
        let sigma = spec.volatility;
        Self {
            log_drift: (spec.drift - 0.5 * sigma * sigma) * spec.dt,
            diffusion: sigma * spec.dt.sqrt(),
            steps: spec.steps,
        }
    }

    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// One GBM update with a given normal draw.
    #[inline]
    pub fn step(&self, price: f64, z: f64) -> f64 {
        price * (self.log_drift + self.diffusion * z).exp()
    }

    /// Advance `initial_price` through every step, returning only the terminal price.
    #[inline]
    pub fn terminal<S: NormalSource>(&self, initial_price: f64, source: &mut S) -> EngineResult<f64> {
        let mut price = initial_price;
        for _ in 0..self.steps {
            price = self.step(price, source.next_normal());
        }
        check_price(price)
    }

    /// Same as [`terminal`](Self::terminal) but records the initial price and every step into `out`.
    /// `out` is cleared first, so it ends with `steps + 1` entries.
    pub fn path<S: NormalSource>(
        &self,
        initial_price: f64,
        source: &mut S,
        out: &mut Vec<f64>,
    ) -> EngineResult<f64> {
        out.clear();
        out.reserve(self.steps + 1);
        out.push(initial_price);

        let mut price = initial_price;
        for _ in 0..self.steps {
            price = self.step(price, source.next_normal());
            out.push(price);
        }
        check_price(price)
    }
}

/// NaN and infinity propagate through the multiplicative update, and an exponent
/// underflow pins the price at zero, so checking the terminal value covers every step.
#[inline]
fn check_price(price: f64) -> EngineResult<f64> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(EngineError::NumericalInstability(format!(
            "terminal price {price} is not a finite positive number"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::normal::BoxMuller;

    struct ConstantNormal(f64);

    impl NormalSource for ConstantNormal {
        fn next_normal(&mut self) -> f64 {
            self.0
        }
    }

    fn spec(volatility: f64, steps: usize) -> PathSpec {
        PathSpec {
            initial_price: 100.0,
            drift: 0.05,
            volatility,
            steps,
            dt: 1.0 / TRADING_DAYS_PER_YEAR,
            num_simulations: 1,
        }
    }

    #[test]
    fn test_single_step_matches_closed_form() {
        let s = spec(0.2, 1);
        let stepper = GbmStepper::new(&s);
        let dt: f64 = 1.0 / 252.0;
        let expected = 100.0 * ((0.05 - 0.5 * 0.04) * dt + 0.2 * dt.sqrt() * 1.5).exp();
        let got = stepper.terminal(100.0, &mut ConstantNormal(1.5)).unwrap();
        assert!((got - expected).abs() < 1e-12, "got={got}, expected={expected}");
    }

    #[test]
    fn test_zero_volatility_is_deterministic_drift() {
        let s = spec(0.0, 252);
        let stepper = GbmStepper::new(&s);
        let mut source = BoxMuller::seeded(1);
        let target = s.deterministic_terminal();
        for _ in 0..10 {
            let got = stepper.terminal(100.0, &mut source).unwrap();
            assert!((got - target).abs() / target < 1e-12, "got={got}, target={target}");
        }
    }

    #[test]
    fn test_path_records_every_step() {
        let s = spec(0.3, 20);
        let stepper = GbmStepper::new(&s);
        let mut out = vec![1.0, 2.0, 3.0];
        let terminal = stepper.path(100.0, &mut BoxMuller::seeded(3), &mut out).unwrap();
        assert_eq!(out.len(), 21);
        assert_eq!(out[0], 100.0);
        assert_eq!(out[20], terminal);

        // Same draws, same terminal whether or not the path is recorded
        let t2 = stepper.terminal(100.0, &mut BoxMuller::seeded(3)).unwrap();
        assert_eq!(terminal.to_bits(), t2.to_bits());
    }

    #[test]
    fn test_overflow_is_instability() {
        let s = spec(0.2, 10);
        let stepper = GbmStepper::new(&s);
        let err = stepper.terminal(f64::MAX, &mut ConstantNormal(50.0)).unwrap_err();
        assert!(matches!(err, EngineError::NumericalInstability(_)), "{err}");
    }

    #[test]
    fn test_underflow_is_instability() {
        // Drift correction of -sigma^2/2 * dt dominates and the price collapses to zero
        let s = spec(10_000.0, 5);
        let stepper = GbmStepper::new(&s);
        let err = stepper.terminal(100.0, &mut ConstantNormal(0.0)).unwrap_err();
        assert!(matches!(err, EngineError::NumericalInstability(_)), "{err}");
    }
}
