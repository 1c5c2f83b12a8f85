//! Task ordering as an [`SaProblem`].

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::cost::{CostModel, ScheduleEvaluation};
use super::neighbor::NeighborMove;
use super::task::Task;
use crate::sa::SaProblem;

/// Ordering the search starts from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialOrder {
    /// Tasks in the order they were submitted.
    #[default]
    Input,
    /// Tasks sorted by deadline, ties kept in submission order.
    EarliestDeadline,
}

/// Search-space options for the ordering problem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub initial_order: InitialOrder,
    pub neighbor_move: NeighborMove,
}

/// Orders a fixed task list to minimize weighted lateness.
///
/// Solutions are permutations of `0..tasks.len()`.
#[derive(Debug, Clone)]
pub struct TaskOrderingProblem {
    tasks: Vec<Task>,
    model: CostModel,
    search: SearchConfig,
}

impl TaskOrderingProblem {
    pub fn new(tasks: Vec<Task>, model: CostModel, search: SearchConfig) -> Self {
        Self {
            tasks,
            model,
            search,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn evaluate(&self, order: &[usize]) -> ScheduleEvaluation {
        self.model.evaluate(&self.tasks, order)
    }
}

impl SaProblem for TaskOrderingProblem {
    type Solution = Vec<usize>;

    fn initial_solution<R: Rng>(&self, _rng: &mut R) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.tasks.len()).collect();
        if self.search.initial_order == InitialOrder::EarliestDeadline {
            order.sort_by(|&a, &b| self.tasks[a].deadline.total_cmp(&self.tasks[b].deadline));
        }
        order
    }

    fn cost(&self, order: &Vec<usize>) -> f64 {
        self.model.cost(&self.tasks, order)
    }

    fn neighbor<R: Rng>(&self, order: &Vec<usize>, rng: &mut R) -> Vec<usize> {
        self.search.neighbor_move.apply(order, rng)
    }

    fn has_neighbors(&self, order: &Vec<usize>) -> bool {
        order.len() >= 2
    }
}
