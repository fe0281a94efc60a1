use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::models::gbm::PathSpec;

/// Compute-budget check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetCheck {
    /// Run allowed
    Allowed,
    /// Blocked: requested path steps over the ceiling
    Exceeded { requested: u128, ceiling: u64 },
}

impl BudgetCheck {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, BudgetCheck::Allowed)
    }

    pub fn into_result(self) -> EngineResult<()> {
        match self {
            BudgetCheck::Allowed => Ok(()),
            BudgetCheck::Exceeded { requested, ceiling } => {
                Err(EngineError::ResourceExhausted { requested, ceiling })
            }
        }
    }
}

/// Check `num_simulations * steps` against the configured ceiling before any work.
/// Pure function, no side effects.
#[inline]
pub fn check_work_budget(spec: &PathSpec, config: &EngineConfig) -> BudgetCheck {
    let requested = spec.path_steps();
    if requested > config.max_path_steps as u128 {
        return BudgetCheck::Exceeded {
            requested,
            ceiling: config.max_path_steps,
        };
    }
    BudgetCheck::Allowed
}
