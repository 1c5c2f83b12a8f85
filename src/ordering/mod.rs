//! Task ordering domain: the task model, the weighted-lateness cost
//! evaluator and the neighborhood moves the annealing engine searches with.

mod cost;
mod neighbor;
mod problem;
mod task;

pub use cost::{CostModel, ScheduleEvaluation, ScheduledTask};
pub use neighbor::{insert_move, reverse_segment, swap_pair, NeighborMove};
pub use problem::{InitialOrder, SearchConfig, TaskOrderingProblem};
pub use task::{validate_tasks, Task, TaskError, TaskErrorKind, MAX_DIFFICULTY, MIN_DIFFICULTY};
