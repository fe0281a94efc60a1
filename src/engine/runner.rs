use crate::config::EngineConfig;
use crate::engine::cancel::CancelToken;
use crate::errors::{EngineError, EngineResult};
use crate::models::gbm::{GbmStepper, PathSpec};
use crate::models::{NormalSource, NormalSourceFactory};
use crate::risk::limits;
use portable_atomic::{AtomicUsize, Ordering};
use rayon::prelude::*;
use std::time::Instant;

/// Terminal values for every simulation, plus the retained sample paths.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Exactly `num_simulations` finite, positive prices, in simulation-index order.
    pub terminal_values: Vec<f64>,
    /// Paths of simulations whose index is a multiple of the sample stride,
    /// in index order, at most `max_sample_paths` of them.
    pub sample_paths: Vec<Vec<f64>>,
}

/// One partition's local slice. Built without touching shared state.
struct PartitionOutput {
    terminal_values: Vec<f64>,
    sample_paths: Vec<Vec<f64>>,
}

/// Runs N independent GBM paths in fixed-size partitions on the rayon pool.
///
/// Partition `p` covers simulation indices `[p * size, (p + 1) * size)` and draws from
/// `sources.source_for_partition(p)`. Outputs are concatenated in partition order, so a
/// given (spec, factory, partition size) produces bit-identical terminal values on any
/// number of threads.
#[derive(Debug, Clone, Copy)]
pub struct SimulationRunner {
    config: EngineConfig,
    sample_paths: bool,
}

impl SimulationRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, sample_paths: true }
    }

    /// Skip path retention entirely (pricing needs terminal values only).
    pub fn without_path_sampling(mut self) -> Self {
        self.sample_paths = false;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run<F: NormalSourceFactory>(
        &self,
        spec: &PathSpec,
        sources: &F,
        cancel: &CancelToken,
    ) -> EngineResult<RunOutput> {
        validate_spec(spec)?;
        self.config.validate()?;

        if let Err(e) = limits::check_work_budget(spec, &self.config).into_result() {
            tracing::warn!(
                simulations = spec.num_simulations,
                steps = spec.steps,
                error = %e,
                "simulation rejected"
            );
            return Err(e);
        }

        let n = spec.num_simulations;
        let partition_size = self.config.partition_size;
        let partitions = n.div_ceil(partition_size);
        let stepper = GbmStepper::new(spec);
        let completed = AtomicUsize::new(0);
        let started = Instant::now();

        tracing::debug!(
            simulations = n,
            steps = spec.steps,
            partitions,
            partition_size,
            "simulation run starting"
        );

        let result: EngineResult<Vec<PartitionOutput>> = (0..partitions)
            .into_par_iter()
            .map(|p| {
                let start = p * partition_size;
                let end = (start + partition_size).min(n);
                let mut source = sources.source_for_partition(p);
                self.run_partition(spec, &stepper, &mut source, start..end, cancel, &completed)
            })
            .collect();

        let parts = match result {
            Ok(parts) => parts,
            Err(EngineError::Cancelled { .. }) => {
                let done = completed.load(Ordering::Relaxed);
                tracing::warn!(completed = done, requested = n, "simulation cancelled, run discarded");
                return Err(EngineError::Cancelled { completed: done, requested: n });
            }
            Err(e) => {
                tracing::error!(error = %e, simulations = n, steps = spec.steps, "simulation aborted");
                return Err(e);
            }
        };

        // Merge barrier
        let mut terminal_values = Vec::with_capacity(n);
        let mut sample_paths = Vec::new();
        for part in parts {
            terminal_values.extend_from_slice(&part.terminal_values);
            sample_paths.extend(part.sample_paths);
        }

        tracing::info!(
            simulations = n,
            steps = spec.steps,
            partitions,
            sample_paths = sample_paths.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulation run complete"
        );

        Ok(RunOutput { terminal_values, sample_paths })
    }

    fn run_partition<S: NormalSource>(
        &self,
        spec: &PathSpec,
        stepper: &GbmStepper,
        source: &mut S,
        indices: std::ops::Range<usize>,
        cancel: &CancelToken,
        completed: &AtomicUsize,
    ) -> EngineResult<PartitionOutput> {
        let mut terminal_values = Vec::with_capacity(indices.len());
        let mut sample_paths = Vec::new();
        let mut path_buf = Vec::new();

        for sim in indices {
            // Cancellation granularity: between whole paths
            if cancel.is_cancelled() {
                completed.fetch_add(terminal_values.len(), Ordering::Relaxed);
                return Err(EngineError::Cancelled { completed: 0, requested: 0 });
            }

            let outcome = if self.keeps_path(sim) {
                stepper
                    .path(spec.initial_price, source, &mut path_buf)
                    .map(|terminal| {
                        sample_paths.push(path_buf.clone());
                        terminal
                    })
            } else {
                stepper.terminal(spec.initial_price, source)
            };

            match outcome {
                Ok(terminal) => terminal_values.push(terminal),
                Err(EngineError::NumericalInstability(msg)) => {
                    return Err(EngineError::NumericalInstability(format!(
                        "simulation {sim}: {msg}"
                    )));
                }
                Err(e) => return Err(e),
            }
        }

        completed.fetch_add(terminal_values.len(), Ordering::Relaxed);
        Ok(PartitionOutput { terminal_values, sample_paths })
    }

    #[inline]
    fn keeps_path(&self, sim: usize) -> bool {
        let stride = self.config.path_sample_stride;
        self.sample_paths && sim % stride == 0 && sim / stride < self.config.max_sample_paths
    }
}

/// Guards for specs built directly rather than through a validated request.
fn validate_spec(spec: &PathSpec) -> EngineResult<()> {
    if spec.num_simulations == 0 {
        return Err(EngineError::invalid("numSimulations", "must be > 0, got 0"));
    }
    if spec.steps == 0 {
        return Err(EngineError::invalid("steps", "must be > 0, got 0"));
    }
    if !(spec.initial_price.is_finite() && spec.initial_price > 0.0) {
        return Err(EngineError::invalid(
            "currentPrice",
            format!("must be > 0, got {}", spec.initial_price),
        ));
    }
    if !(spec.volatility.is_finite() && spec.volatility >= 0.0) {
        return Err(EngineError::invalid(
            "volatility",
            format!("must be >= 0, got {}", spec.volatility),
        ));
    }
    if !spec.drift.is_finite() {
        return Err(EngineError::invalid("riskFreeRate", format!("must be finite, got {}", spec.drift)));
    }
    if !(spec.dt.is_finite() && spec.dt > 0.0) {
        return Err(EngineError::invalid("dt", format!("must be > 0, got {}", spec.dt)));
    }
    Ok(())
}
