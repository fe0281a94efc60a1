use crate::errors::{EngineError, EngineResult};
use crate::models::gbm::{PathSpec, TRADING_DAYS_PER_YEAR};
use crate::risk::statistics::{Percentiles, TailRisk};
use smallvec::SmallVec;

// ── Requests INTO the engine ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// Price-distribution simulation over a horizon of trading days.
/// Drift is the risk-free rate.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    pub current_price: f64,
    pub volatility: f64,
    pub risk_free_rate: f64,
    /// Signed on the wire; `validate` rejects values <= 0.
    pub time_horizon_days: i64,
    pub num_simulations: i64,
    pub confidence_level: f64,
    /// Extra VaR/CVaR levels reported next to the primary one.
    #[serde(default)]
    pub additional_confidence_levels: Vec<f64>,
}

impl SimulationRequest {
    /// Fail-fast validation. Runs before any path is simulated.
    pub fn validate(&self) -> EngineResult<()> {
        require_count("numSimulations", self.num_simulations)?;
        require_positive("currentPrice", self.current_price)?;
        require_non_negative("volatility", self.volatility)?;
        require_finite("riskFreeRate", self.risk_free_rate)?;
        require_count("timeHorizonDays", self.time_horizon_days)?;
        require_unit_interval("confidenceLevel", self.confidence_level)?;
        for &level in &self.additional_confidence_levels {
            require_unit_interval("additionalConfidenceLevels", level)?;
        }
        Ok(())
    }

    pub fn path_spec(&self) -> PathSpec {
        PathSpec {
            initial_price: self.current_price,
            drift: self.risk_free_rate,
            volatility: self.volatility,
            steps: self.time_horizon_days.max(0) as usize,
            dt: 1.0 / TRADING_DAYS_PER_YEAR,
            num_simulations: self.num_simulations.max(0) as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionPricingRequest {
    pub spot_price: f64,
    pub strike_price: f64,
    pub volatility: f64,
    pub risk_free_rate: f64,
    pub time_to_expiry_years: f64,
    pub option_type: OptionType,
    pub num_simulations: i64,
}

impl OptionPricingRequest {
    pub fn validate(&self) -> EngineResult<()> {
        require_count("numSimulations", self.num_simulations)?;
        require_positive("spotPrice", self.spot_price)?;
        require_positive("strikePrice", self.strike_price)?;
        require_non_negative("volatility", self.volatility)?;
        require_finite("riskFreeRate", self.risk_free_rate)?;
        require_positive("timeToExpiryYears", self.time_to_expiry_years)?;
        Ok(())
    }

    /// Risk-neutral path spec: drift = r, one step per trading day (at least one),
    /// step length chosen so the steps span exactly `time_to_expiry_years`.
    pub fn path_spec(&self) -> PathSpec {
        let steps = expiry_steps(self.time_to_expiry_years);
        PathSpec {
            initial_price: self.spot_price,
            drift: self.risk_free_rate,
            volatility: self.volatility,
            steps,
            dt: self.time_to_expiry_years / steps as f64,
            num_simulations: self.num_simulations.max(0) as usize,
        }
    }
}

/// `round(T * 252)`, never below one step.
#[inline]
pub fn expiry_steps(time_to_expiry_years: f64) -> usize {
    ((time_to_expiry_years * TRADING_DAYS_PER_YEAR).round() as usize).max(1)
}

// ── Results OUT of the engine ──

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub mean_price: f64,
    pub median_price: f64,
    pub value_at_risk: f64,
    #[serde(rename = "conditionalVaR")]
    pub conditional_var: f64,
    pub probability_of_profit: f64,
    pub percentiles: Percentiles,
    pub min_price: f64,
    pub max_price: f64,
    pub std_dev: f64,
    pub expected_return: f64,
    pub annualized_return: f64,
    pub probability_of_loss: f64,
    pub tail_risk: SmallVec<[TailRisk; 4]>,
    pub simulations_run: usize,
    pub steps: usize,
    pub sample_paths: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionPriceResult {
    pub option_price: f64,
    pub standard_error: f64,
    pub parameters: OptionPricingRequest,
    pub simulations_used: usize,
    pub steps: usize,
}

// ── Validation helpers ──

fn require_finite(name: &'static str, value: f64) -> EngineResult<()> {
    if !value.is_finite() {
        return Err(EngineError::invalid(name, format!("must be finite, got {value}")));
    }
    Ok(())
}

fn require_positive(name: &'static str, value: f64) -> EngineResult<()> {
    require_finite(name, value)?;
    if value <= 0.0 {
        return Err(EngineError::invalid(name, format!("must be > 0, got {value}")));
    }
    Ok(())
}

fn require_count(name: &'static str, value: i64) -> EngineResult<()> {
    if value <= 0 {
        return Err(EngineError::invalid(name, format!("must be > 0, got {value}")));
    }
    Ok(())
}

fn require_non_negative(name: &'static str, value: f64) -> EngineResult<()> {
    require_finite(name, value)?;
    if value < 0.0 {
        return Err(EngineError::invalid(name, format!("must be >= 0, got {value}")));
    }
    Ok(())
}

fn require_unit_interval(name: &'static str, value: f64) -> EngineResult<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(EngineError::invalid(name, format!("must lie in (0, 1), got {value}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> SimulationRequest {
        SimulationRequest {
            current_price: 100.0,
            volatility: 0.25,
            risk_free_rate: 0.045,
            time_horizon_days: 252,
            num_simulations: 1000,
            confidence_level: 0.95,
            additional_confidence_levels: Vec::new(),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(base_request().validate().is_ok());
    }

    #[test]
    fn test_each_invalid_field_rejected() {
        let cases: Vec<(&str, SimulationRequest)> = vec![
            ("numSimulations", SimulationRequest { num_simulations: 0, ..base_request() }),
            ("currentPrice", SimulationRequest { current_price: 0.0, ..base_request() }),
            ("currentPrice", SimulationRequest { current_price: f64::NAN, ..base_request() }),
            ("volatility", SimulationRequest { volatility: -0.1, ..base_request() }),
            ("riskFreeRate", SimulationRequest { risk_free_rate: f64::INFINITY, ..base_request() }),
            ("timeHorizonDays", SimulationRequest { time_horizon_days: 0, ..base_request() }),
            ("confidenceLevel", SimulationRequest { confidence_level: 1.0, ..base_request() }),
            ("confidenceLevel", SimulationRequest { confidence_level: 0.0, ..base_request() }),
            (
                "additionalConfidenceLevels",
                SimulationRequest { additional_confidence_levels: vec![0.99, 1.5], ..base_request() },
            ),
        ];
        for (field, req) in cases {
            match req.validate() {
                Err(EngineError::InvalidParameter { name, .. }) => {
                    assert_eq!(name, field, "wrong field reported for {req:?}")
                }
                other => panic!("{field}: expected InvalidParameter, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_zero_volatility_is_valid() {
        let req = SimulationRequest { volatility: 0.0, ..base_request() };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_option_steps_follow_trading_days() {
        assert_eq!(expiry_steps(0.25), 63);
        assert_eq!(expiry_steps(1.0), 252);
        // Sub-day expiries still simulate one step
        assert_eq!(expiry_steps(0.001), 1);

        let req = OptionPricingRequest {
            spot_price: 100.0,
            strike_price: 105.0,
            volatility: 0.2,
            risk_free_rate: 0.05,
            time_to_expiry_years: 0.25,
            option_type: OptionType::Call,
            num_simulations: 10,
        };
        let spec = req.path_spec();
        assert_eq!(spec.steps, 63);
        assert!((spec.dt * spec.steps as f64 - 0.25).abs() < 1e-12);
        assert!((spec.dt - 1.0 / 252.0).abs() < 1e-12);
    }

    #[test]
    fn test_option_type_json() {
        let t: OptionType = serde_json::from_str("\"put\"").unwrap();
        assert_eq!(t, OptionType::Put);
        assert_eq!(OptionType::Call.to_string(), "call");
    }

    #[test]
    fn test_request_json_is_camel_case() {
        let json = r#"{
            "currentPrice": 100.0, "volatility": 0.2, "riskFreeRate": 0.05,
            "timeHorizonDays": 30, "numSimulations": 500, "confidenceLevel": 0.99
        }"#;
        let req: SimulationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.time_horizon_days, 30);
        assert!(req.additional_confidence_levels.is_empty());
    }

    #[test]
    fn test_negative_counts_in_json_are_invalid_parameters() {
        let json = r#"{
            "currentPrice": 100.0, "volatility": 0.2, "riskFreeRate": 0.05,
            "timeHorizonDays": 30, "numSimulations": -10, "confidenceLevel": 0.95
        }"#;
        let req: SimulationRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(
            req.validate(),
            Err(EngineError::InvalidParameter { name: "numSimulations", .. })
        ));

        let json = r#"{
            "currentPrice": 100.0, "volatility": 0.2, "riskFreeRate": 0.05,
            "timeHorizonDays": -5, "numSimulations": 100, "confidenceLevel": 0.95
        }"#;
        let req: SimulationRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(
            req.validate(),
            Err(EngineError::InvalidParameter { name: "timeHorizonDays", .. })
        ));

        let json = r#"{
            "spotPrice": 100.0, "strikePrice": 105.0, "volatility": 0.2, "riskFreeRate": 0.05,
            "timeToExpiryYears": 0.25, "optionType": "call", "numSimulations": -1
        }"#;
        let req: OptionPricingRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(
            req.validate(),
            Err(EngineError::InvalidParameter { name: "numSimulations", .. })
        ));
    }
}
