//! Weighted-lateness cost model.
//!
//! Tasks run back to back from time 0 in schedule order. A task that
//! finishes after its deadline contributes `weight(difficulty) * lateness`
//! to the total, with
//!
//! ```text
//! weight(d) = deadline_weight + difficulty_weight * d
//! ```
//!
//! Both weights are non-negative, so the weight never decreases with
//! difficulty and the cost is never negative.

use serde::{Deserialize, Serialize};

use super::task::Task;

/// Penalty weights of the cost function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Penalty per hour of lateness, for every task.
    pub deadline_weight: f64,
    /// Extra penalty per hour of lateness, per difficulty level.
    pub difficulty_weight: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            deadline_weight: 5.0,
            difficulty_weight: 2.5,
        }
    }
}

/// One task placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub name: String,
    pub duration: f64,
    pub deadline: f64,
    pub difficulty: u8,
    pub start_time: f64,
    pub finish_time: f64,
    pub lateness: f64,
}

/// Cost of a schedule together with its per-task timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEvaluation {
    pub cost: f64,
    pub detail: Vec<ScheduledTask>,
}

impl CostModel {
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("deadline_weight", self.deadline_weight),
            ("difficulty_weight", self.difficulty_weight),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{field} must be a non-negative number, got {value}"));
            }
        }
        Ok(())
    }

    /// Lateness multiplier for a task of the given difficulty.
    pub fn weight(&self, difficulty: u8) -> f64 {
        self.deadline_weight + self.difficulty_weight * f64::from(difficulty)
    }

    /// Total cost of running `tasks` in `order`.
    ///
    /// `order` holds indices into `tasks`. Gives the same bits as
    /// [`evaluate`](Self::evaluate)`(..).cost`.
    pub fn cost(&self, tasks: &[Task], order: &[usize]) -> f64 {
        let mut clock = 0.0;
        let mut total = 0.0;
        for &idx in order {
            let task = &tasks[idx];
            clock += task.duration;
            total += self.weight(task.difficulty) * lateness(clock, task.deadline);
        }
        total
    }

    /// Cost plus the finish time and lateness of every task.
    pub fn evaluate(&self, tasks: &[Task], order: &[usize]) -> ScheduleEvaluation {
        let mut clock = 0.0;
        let mut total = 0.0;
        let mut detail = Vec::with_capacity(order.len());
        for &idx in order {
            let task = &tasks[idx];
            let start_time = clock;
            clock += task.duration;
            let late = lateness(clock, task.deadline);
            total += self.weight(task.difficulty) * late;
            detail.push(ScheduledTask {
                name: task.name.clone(),
                duration: task.duration,
                deadline: task.deadline,
                difficulty: task.difficulty,
                start_time,
                finish_time: clock,
                lateness: late,
            });
        }
        ScheduleEvaluation {
            cost: total,
            detail,
        }
    }
}

#[inline]
fn lateness(finish_time: f64, deadline: f64) -> f64 {
    (finish_time - deadline).max(0.0)
}
