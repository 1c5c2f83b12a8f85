//! Core traits and state types for Simulated Annealing.

use std::ops::ControlFlow;

use rand::Rng;

/// Defines a Simulated Annealing problem.
///
/// The user implements neighbor generation and cost evaluation.
/// The SA engine handles temperature management, acceptance
/// criterion, and cooling.
///
/// # Minimization
///
/// SA minimizes the cost function. For maximization, negate the cost.
///
/// # Examples
///
/// ```ignore
/// struct TspProblem { distances: Vec<Vec<f64>> }
///
/// impl SaProblem for TspProblem {
///     type Solution = Vec<usize>;
///
///     fn initial_solution<R: Rng>(&self, _rng: &mut R) -> Vec<usize> {
///         (0..self.distances.len()).collect()
///     }
///
///     fn cost(&self, tour: &Vec<usize>) -> f64 {
///         tour.windows(2).map(|w| self.distances[w[0]][w[1]]).sum()
///     }
///
///     fn neighbor<R: Rng>(&self, tour: &Vec<usize>, rng: &mut R) -> Vec<usize> {
///         let mut new = tour.clone();
///         let i = rng.random_range(0..new.len());
///         let j = rng.random_range(0..new.len());
///         new.swap(i, j);
///         new
///     }
/// }
/// ```
pub trait SaProblem: Send + Sync {
    /// The solution representation type.
    type Solution: Clone + Send;

    /// Creates the starting solution.
    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Self::Solution;

    /// Computes the cost of a solution. Lower is better.
    fn cost(&self, solution: &Self::Solution) -> f64;

    /// Generates a neighbor of the current solution.
    ///
    /// Only called when [`has_neighbors`](Self::has_neighbors) is true.
    fn neighbor<R: Rng>(&self, solution: &Self::Solution, rng: &mut R) -> Self::Solution;

    /// Whether `solution` has any neighbor at all.
    ///
    /// When false the engine finishes right after initialization with the
    /// initial solution as the optimum.
    fn has_neighbors(&self, _solution: &Self::Solution) -> bool {
        true
    }
}

/// Lifecycle phase of one annealing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Cooling,
    Finished,
    Cancelled,
    Errored,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Cancelled | Phase::Errored)
    }
}

/// Reported once, after initialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaStart {
    pub initial_cost: f64,
    pub initial_temperature: f64,
    /// Seed actually used, resolved from OS entropy when none was configured.
    pub seed: u64,
}

/// Periodic snapshot of the search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaProgress {
    pub iteration: usize,
    pub temperature: f64,
    pub current_cost: f64,
    pub best_cost: f64,
    /// Whether the move of this iteration was accepted.
    pub accepted: bool,
}

/// Receives the engine's lifecycle notifications while it runs.
///
/// Returning [`ControlFlow::Break`] from any hook stops the run at the
/// current iteration boundary; the run then ends as [`Phase::Cancelled`].
pub trait SaObserver {
    fn on_start(&mut self, _start: &SaStart) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn on_progress(&mut self, _progress: &SaProgress) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn on_temperature(&mut self, _temperature: f64) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// No-op observer.
impl SaObserver for () {}
