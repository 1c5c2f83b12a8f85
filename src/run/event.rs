//! Events a run emits, in the shape subscribers receive them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ordering::ScheduledTask;

/// Identifier of one run, unique within a [`RunController`](super::RunController).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartPayload {
    pub initial_cost: f64,
    pub initial_temperature: f64,
    pub min_temperature: f64,
    pub iterations_per_temperature: usize,
    pub seed: u64,
    pub task_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub iteration: usize,
    #[serde(rename = "T")]
    pub temperature: f64,
    pub current_cost: f64,
    pub best_cost: f64,
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishPayload {
    pub best_cost: f64,
    /// Indices into the submitted task list, in execution order.
    pub best_order: Vec<usize>,
    pub detailed_schedule: Vec<ScheduledTask>,
}

/// One record of a run's event stream.
///
/// Serializes as `{"type": "<kind>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RunEvent {
    Start(StartPayload),
    TempChange {
        #[serde(rename = "T")]
        temperature: f64,
    },
    Progress(ProgressPayload),
    Finish(FinishPayload),
    Error {
        message: String,
    },
}

impl RunEvent {
    pub fn error(message: impl Into<String>) -> Self {
        RunEvent::Error {
            message: message.into(),
        }
    }

    /// Wire name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            RunEvent::Start(_) => "start",
            RunEvent::TempChange { .. } => "temp_change",
            RunEvent::Progress(_) => "progress",
            RunEvent::Finish(_) => "finish",
            RunEvent::Error { .. } => "error",
        }
    }

    /// `finish` and `error` end a run's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::Finish(_) | RunEvent::Error { .. })
    }

    /// Progress-type events may be dropped under backpressure.
    pub fn is_droppable(&self) -> bool {
        matches!(self, RunEvent::Progress(_) | RunEvent::TempChange { .. })
    }
}
