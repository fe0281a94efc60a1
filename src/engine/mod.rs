pub mod cancel;
pub mod runner;

use crate::config::EngineConfig;
use crate::errors::EngineResult;
use crate::models::NormalSourceFactory;
use crate::pricing::option::OptionPricer;
use crate::risk::statistics::compute_risk_report;
use crate::types::{OptionPriceResult, OptionPricingRequest, SimulationRequest, SimulationResult};
use cancel::CancelToken;
use runner::SimulationRunner;

/// Entry point for the calling layer.
///
/// Holds only its limits. Every call is a pure function of the request, the
/// random-source factory and the cancel token it is handed.
#[derive(Debug, Clone, Copy)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Simulate terminal prices and summarize their distribution.
    pub fn simulate<F: NormalSourceFactory>(
        &self,
        request: &SimulationRequest,
        sources: &F,
        cancel: &CancelToken,
    ) -> EngineResult<SimulationResult> {
        request.validate()?;

        let spec = request.path_spec();
        let run = SimulationRunner::new(self.config).run(&spec, sources, cancel)?;

        let simulations_run = run.terminal_values.len();
        let report = compute_risk_report(
            run.terminal_values,
            request.current_price,
            request.confidence_level,
            &request.additional_confidence_levels,
            spec.horizon_years(),
        )?;

        Ok(SimulationResult {
            mean_price: report.mean,
            median_price: report.median,
            value_at_risk: report.value_at_risk,
            conditional_var: report.conditional_var,
            probability_of_profit: report.probability_of_profit,
            percentiles: report.percentiles,
            min_price: report.min_price,
            max_price: report.max_price,
            std_dev: report.std_dev,
            expected_return: report.expected_return,
            annualized_return: report.annualized_return,
            probability_of_loss: report.probability_of_loss,
            tail_risk: report.tail_risk,
            simulations_run,
            steps: spec.steps,
            sample_paths: run.sample_paths,
        })
    }

    /// Risk-neutral Monte Carlo price of a European option.
    pub fn price_option<F: NormalSourceFactory>(
        &self,
        request: &OptionPricingRequest,
        sources: &F,
        cancel: &CancelToken,
    ) -> EngineResult<OptionPriceResult> {
        OptionPricer::new(SimulationRunner::new(self.config)).price(request, sources, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;
    use crate::models::normal::SeededBoxMuller;

    fn sanity_request() -> SimulationRequest {
        SimulationRequest {
            current_price: 100.0,
            volatility: 0.25,
            risk_free_rate: 0.045,
            time_horizon_days: 252,
            num_simulations: 10_000,
            confidence_level: 0.95,
            additional_confidence_levels: vec![0.99],
        }
    }

    #[test]
    fn test_end_to_end_matches_lognormal_theory() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let result = engine
            .simulate(&sanity_request(), &SeededBoxMuller::new(31), &CancelToken::new())
            .unwrap();

        // E[S_T] = S0 * e^{rT}, sd = E[S_T] * sqrt(e^{sigma^2 T} - 1) ~ 27, so SE(mean) ~ 0.27
        let expected_mean = 100.0 * 0.045_f64.exp();
        assert!(
            (result.mean_price - expected_mean).abs() < 1.2,
            "mean {} vs theoretical {expected_mean}",
            result.mean_price
        );
        let expected_sd = expected_mean * ((0.25_f64 * 0.25).exp() - 1.0).sqrt();
        assert!((result.std_dev - expected_sd).abs() < 1.5, "sd {} vs {expected_sd}", result.std_dev);

        assert!(result.value_at_risk > 0.0, "VaR {}", result.value_at_risk);
        assert!(result.conditional_var >= result.value_at_risk);
        assert!((0.0..=1.0).contains(&result.probability_of_profit));
        assert!(result.probability_of_profit + result.probability_of_loss <= 1.0);
        assert!(result.min_price <= result.percentiles.p5);
        assert!(result.percentiles.p5 <= result.percentiles.p25);
        assert!(result.percentiles.p25 <= result.percentiles.p50);
        assert!(result.percentiles.p50 <= result.percentiles.p75);
        assert!(result.percentiles.p75 <= result.percentiles.p95);
        assert!(result.percentiles.p95 <= result.max_price);
        assert_eq!(result.percentiles.p50, result.median_price);

        assert_eq!(result.simulations_run, 10_000);
        assert_eq!(result.steps, 252);
        assert_eq!(result.sample_paths.len(), 100);
        assert!(result.sample_paths.iter().all(|p| p.len() == 253));
        assert_eq!(result.tail_risk.len(), 2);
        assert!(result.tail_risk[1].value_at_risk >= result.value_at_risk);
    }

    #[test]
    fn test_var_positive_across_seeds() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        for seed in 0..5 {
            let result = engine
                .simulate(&sanity_request(), &SeededBoxMuller::new(seed), &CancelToken::new())
                .unwrap();
            assert!(result.value_at_risk > 0.0, "seed {seed}: VaR {}", result.value_at_risk);
        }
    }

    #[test]
    fn test_invalid_request_rejected() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let req = SimulationRequest { confidence_level: 1.2, ..sanity_request() };
        let err = engine.simulate(&req, &SeededBoxMuller::new(1), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name: "confidenceLevel", .. }));
    }

    #[test]
    fn test_result_json_shape() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let req = SimulationRequest { num_simulations: 200, time_horizon_days: 5, ..sanity_request() };
        let result = engine.simulate(&req, &SeededBoxMuller::new(1), &CancelToken::new()).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        for key in [
            "meanPrice",
            "medianPrice",
            "valueAtRisk",
            "conditionalVaR",
            "probabilityOfProfit",
            "percentiles",
            "minPrice",
            "maxPrice",
            "samplePaths",
        ] {
            assert!(json.get(key).is_some(), "missing {key} in {json}");
        }
        for key in ["p1", "p5", "p10", "p25", "p50", "p75", "p90", "p95", "p99"] {
            assert!(json["percentiles"].get(key).is_some(), "missing percentile {key}");
        }
        assert!(json.get("annualizedReturn").is_some());
    }

    #[test]
    fn test_bad_config_rejected() {
        let cfg = EngineConfig { path_sample_stride: 0, ..EngineConfig::default() };
        assert!(matches!(Engine::new(cfg), Err(EngineError::Config(_))));
    }
}
