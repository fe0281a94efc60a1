/// Domain-specific error types for the simulation engine.
/// Every failure is reported before or instead of a result. The engine must:
/// - Reject invalid requests before any path is simulated
/// - Discard a run completely on numerical corruption or cancellation
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    #[error("resource exhausted: {requested} path steps requested, ceiling is {ceiling}")]
    ResourceExhausted { requested: u128, ceiling: u64 },

    #[error("simulation cancelled after {completed} of {requested} paths")]
    Cancelled { completed: usize, requested: usize },

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(String),
}

impl EngineError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
