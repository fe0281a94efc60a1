use crate::errors::{EngineError, EngineResult};
use std::str::FromStr;
use std::time::Duration;

/// Engine-facing limits. Passed explicitly into every run; the engine reads nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Ceiling on `num_simulations * steps` for a single request.
    pub max_path_steps: u64,
    /// Keep every n-th simulated path for visualization.
    pub path_sample_stride: usize,
    /// Hard cap on retained sample paths.
    pub max_sample_paths: usize,
    /// Simulations per parallel partition. Each partition owns one random stream,
    /// so results for a given seed depend on this value but never on thread count.
    pub partition_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_path_steps: 100_000 * 252,
            path_sample_stride: 100,
            max_sample_paths: 100,
            partition_size: 1024,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_path_steps == 0 {
            return Err(EngineError::Config("MAX_PATH_STEPS must be > 0".into()));
        }
        if self.path_sample_stride == 0 {
            return Err(EngineError::Config("PATH_SAMPLE_STRIDE must be > 0".into()));
        }
        if self.partition_size == 0 {
            return Err(EngineError::Config("PARTITION_SIZE must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub engine: EngineConfig,
    /// Fixed seed for reproducible runs. `None` lets the caller draw one per request.
    pub seed: Option<u64>,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = EngineConfig::default();

        let engine = EngineConfig {
            max_path_steps: parse_env_or("MAX_PATH_STEPS", defaults.max_path_steps)?,
            path_sample_stride: parse_env_or("PATH_SAMPLE_STRIDE", defaults.path_sample_stride)?,
            max_sample_paths: parse_env_or("MAX_SAMPLE_PATHS", defaults.max_sample_paths)?,
            partition_size: parse_env_or("PARTITION_SIZE", defaults.partition_size)?,
        };
        engine.validate()?;

        let seed = match std::env::var("SIMULATION_SEED") {
            Ok(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|e| EngineError::Config(format!("SIMULATION_SEED: {e}")))?,
            ),
            Err(_) => None,
        };

        let timeout_secs: u64 = parse_env_or("REQUEST_TIMEOUT_SECS", 30)?;
        if timeout_secs == 0 {
            return Err(EngineError::Config("REQUEST_TIMEOUT_SECS must be > 0".into()));
        }

        Ok(Self {
            engine,
            seed,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_env_or<T>(key: &str, default: T) -> EngineResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| EngineError::Config(format!("{key}: {e}"))),
        Err(_) => Ok(default),
    }
}
