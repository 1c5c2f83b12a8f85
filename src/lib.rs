//! Task ordering by simulated annealing, with live progress streaming.
//!
//! Orders a small list of tasks (duration, deadline, difficulty) so that
//! the difficulty-weighted lateness is as small as possible, and streams
//! the search to one subscriber while it runs.
//!
//! - [`ordering`]: task model, cost evaluator and neighborhood moves.
//! - [`sa`]: domain-agnostic Simulated Annealing engine with cooling
//!   schedules, cancellation and an observer hook.
//! - [`run`]: single-flight run controller; executes the engine on a
//!   worker thread and emits typed [`run::RunEvent`]s.
//! - [`transport`]: delivers a run's events as SSE or JSON lines and turns
//!   subscriber loss into cancellation.
//! - [`store`], [`config`], [`server`]: task-list persistence,
//!   configuration and the HTTP API.
//!
//! # Example
//!
//! ```
//! use u_taskorder::ordering::{CostModel, SearchConfig, Task, TaskOrderingProblem};
//! use u_taskorder::sa::{SaConfig, SaRunner};
//!
//! let tasks = vec![
//!     Task::new("essay", 3.0, 4.0, 4),
//!     Task::new("quiz", 1.0, 1.0, 2),
//! ];
//! let problem = TaskOrderingProblem::new(tasks, CostModel::default(), SearchConfig::default());
//! let result = SaRunner::run(&problem, &SaConfig::default().with_seed(1)).unwrap();
//! assert_eq!(result.best, vec![1, 0]);
//! ```

pub mod config;
pub mod ordering;
pub mod run;
pub mod sa;
pub mod server;
pub mod store;
pub mod transport;
