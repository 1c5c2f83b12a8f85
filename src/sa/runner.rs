//! SA execution loop.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use super::config::{CoolingSchedule, SaConfig};
use super::types::{Phase, SaObserver, SaProblem, SaProgress, SaStart};

/// Failures that move a run into [`Phase::Errored`].
#[derive(Debug, Error, PartialEq)]
pub enum SaError {
    #[error("invalid annealing configuration: {0}")]
    InvalidConfig(String),

    #[error("cost evaluation produced a non-finite value ({cost}) at iteration {iteration}")]
    NonFiniteCost { iteration: usize, cost: f64 },
}

/// Result of a Simulated Annealing run that reached a terminal phase
/// without error.
#[derive(Debug, Clone)]
pub struct SaResult<S: Clone> {
    /// The best solution found.
    pub best: S,

    /// Cost of the best solution.
    pub best_cost: f64,

    /// Total number of iterations (neighbor evaluations).
    pub iterations: usize,

    /// Final temperature when the engine stopped.
    pub final_temperature: f64,

    /// Number of accepted moves (including improvements).
    pub accepted_moves: usize,

    /// Number of improving moves.
    pub improving_moves: usize,

    /// `Finished` or `Cancelled`.
    pub phase: Phase,

    /// Seed the run used.
    pub seed: u64,

    /// Best cost sampled at every progress report.
    pub cost_history: Vec<f64>,
}

impl<S: Clone> SaResult<S> {
    pub fn cancelled(&self) -> bool {
        self.phase == Phase::Cancelled
    }
}

/// Mutable search state of one run. Lives only for the duration of
/// [`SaRunner::run_observed`].
struct SaState<S> {
    current: S,
    current_cost: f64,
    best: S,
    best_cost: f64,
    temperature: f64,
    iteration: usize,
    phase: Phase,
}

/// Creates the engine's random source from a seed.
pub fn create_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Executes the Simulated Annealing algorithm.
pub struct SaRunner;

impl SaRunner {
    /// Runs SA optimization to completion.
    pub fn run<P: SaProblem>(
        problem: &P,
        config: &SaConfig,
    ) -> Result<SaResult<P::Solution>, SaError> {
        Self::run_observed(problem, config, None, &mut ())
    }

    /// Runs SA with an optional cancellation flag.
    pub fn run_with_cancel<P: SaProblem>(
        problem: &P,
        config: &SaConfig,
        cancel: Option<&AtomicBool>,
    ) -> Result<SaResult<P::Solution>, SaError> {
        Self::run_observed(problem, config, cancel, &mut ())
    }

    /// Runs SA, reporting start, progress and cooling steps to `observer`.
    ///
    /// The cancellation flag is checked once per iteration, before the next
    /// neighbor is drawn.
    pub fn run_observed<P, O>(
        problem: &P,
        config: &SaConfig,
        cancel: Option<&AtomicBool>,
        observer: &mut O,
    ) -> Result<SaResult<P::Solution>, SaError>
    where
        P: SaProblem,
        O: SaObserver + ?Sized,
    {
        config.validate().map_err(SaError::InvalidConfig)?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = create_rng(seed);

        // Init
        let initial = problem.initial_solution(&mut rng);
        let initial_cost = problem.cost(&initial);
        if !initial_cost.is_finite() {
            return Err(SaError::NonFiniteCost {
                iteration: 0,
                cost: initial_cost,
            });
        }
        let mut state = SaState {
            best: initial.clone(),
            best_cost: initial_cost,
            current: initial,
            current_cost: initial_cost,
            temperature: config.initial_temperature,
            iteration: 0,
            phase: Phase::Init,
        };

        let mut accepted_moves = 0usize;
        let mut improving_moves = 0usize;
        let mut cost_history = vec![initial_cost];

        let step_len = config.temperature_step_len();
        let linear_max_steps = compute_linear_steps(config);
        let mut step = 0usize; // temperature step counter

        let start = SaStart {
            initial_cost,
            initial_temperature: state.temperature,
            seed,
        };
        state.phase = if observer.on_start(&start).is_break() {
            Phase::Cancelled
        } else if !problem.has_neighbors(&state.current) {
            Phase::Finished
        } else {
            Phase::Cooling
        };

        while state.phase == Phase::Cooling {
            if state.temperature <= config.min_temperature
                || (config.max_iterations > 0 && state.iteration >= config.max_iterations)
            {
                state.phase = Phase::Finished;
                break;
            }
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                state.phase = Phase::Cancelled;
                break;
            }

            let neighbor = problem.neighbor(&state.current, &mut rng);
            let neighbor_cost = problem.cost(&neighbor);
            if !neighbor_cost.is_finite() {
                return Err(SaError::NonFiniteCost {
                    iteration: state.iteration,
                    cost: neighbor_cost,
                });
            }
            let delta = neighbor_cost - state.current_cost;

            // Metropolis acceptance criterion
            let accept = if delta <= 0.0 {
                if delta < 0.0 {
                    improving_moves += 1;
                }
                true
            } else {
                let probability = (-delta / state.temperature).exp();
                rng.random_range(0.0..1.0) < probability
            };

            if accept {
                state.current = neighbor;
                state.current_cost = neighbor_cost;
                accepted_moves += 1;

                if state.current_cost < state.best_cost {
                    state.best = state.current.clone();
                    state.best_cost = state.current_cost;
                }
            }

            state.iteration += 1;

            if state.iteration.is_multiple_of(config.progress_interval) {
                cost_history.push(state.best_cost);
                let progress = SaProgress {
                    iteration: state.iteration,
                    temperature: state.temperature,
                    current_cost: state.current_cost,
                    best_cost: state.best_cost,
                    accepted: accept,
                };
                if observer.on_progress(&progress).is_break() {
                    state.phase = Phase::Cancelled;
                    break;
                }
            }

            if state.iteration.is_multiple_of(step_len) {
                state.temperature = cool(state.temperature, config, step, linear_max_steps);
                step += 1;
                if observer.on_temperature(state.temperature).is_break() {
                    state.phase = Phase::Cancelled;
                    break;
                }
            }
        }

        debug!(
            phase = ?state.phase,
            iterations = state.iteration,
            best_cost = state.best_cost,
            "annealing stopped"
        );

        if cost_history
            .last()
            .is_none_or(|&last| (last - state.best_cost).abs() > 1e-15)
        {
            cost_history.push(state.best_cost);
        }

        Ok(SaResult {
            best: state.best,
            best_cost: state.best_cost,
            iterations: state.iteration,
            final_temperature: state.temperature,
            accepted_moves,
            improving_moves,
            phase: state.phase,
            seed,
            cost_history,
        })
    }
}

/// Apply the cooling schedule to compute the next temperature.
fn cool(temperature: f64, config: &SaConfig, step: usize, linear_max_steps: usize) -> f64 {
    match config.cooling {
        CoolingSchedule::Geometric { alpha } => temperature * alpha,

        CoolingSchedule::Linear => {
            let t = config.initial_temperature
                - (step + 1) as f64 * (config.initial_temperature - config.min_temperature)
                    / linear_max_steps as f64;
            t.max(config.min_temperature)
        }

        CoolingSchedule::LundyMees { beta } => temperature / (1.0 + beta * temperature),
    }
}

/// Estimate the number of temperature steps for linear cooling.
fn compute_linear_steps(config: &SaConfig) -> usize {
    match config.cooling {
        CoolingSchedule::Linear => {
            if config.max_iterations > 0 && config.iterations_per_temperature > 0 {
                (config.max_iterations / config.iterations_per_temperature).max(1)
            } else {
                1000
            }
        }
        _ => 0,
    }
}
