//! Monte Carlo GBM price-path simulation, distributional risk statistics and
//! European option pricing.
//!
//! The engine is a pure function of its explicit inputs plus the random-source
//! factory it is handed; it holds no state between requests.

pub mod config;
pub mod engine;
pub mod errors;
pub mod models;
pub mod pricing;
pub mod risk;
pub mod types;

pub use config::{AppConfig, EngineConfig};
pub use engine::cancel::CancelToken;
pub use engine::Engine;
pub use errors::{EngineError, EngineResult};
pub use models::normal::{BoxMuller, SeededBoxMuller};
pub use models::{NormalSource, NormalSourceFactory};
pub use types::{
    OptionPriceResult, OptionPricingRequest, OptionType, SimulationRequest, SimulationResult,
};
