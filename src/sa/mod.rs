//! Simulated Annealing (SA).
//!
//! A single-solution trajectory metaheuristic inspired by the physical
//! annealing process. Accepts worsening moves with a probability that
//! decreases over time (temperature), allowing the search to escape
//! local optima.
//!
//! The engine moves through [`Phase::Init`], [`Phase::Cooling`] and ends in
//! one of [`Phase::Finished`], [`Phase::Cancelled`] or (as an `Err`)
//! [`Phase::Errored`]. Callers observe the run through [`SaObserver`].
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Cerny (1985), "Thermodynamical Approach to the Travelling Salesman Problem"
//! - Lundy & Mees (1986), "Convergence of an Annealing Algorithm"

mod config;
mod runner;
mod types;

pub use config::{CoolingSchedule, SaConfig};
pub use runner::{create_rng, SaError, SaResult, SaRunner};
pub use types::{Phase, SaObserver, SaProblem, SaProgress, SaStart};
