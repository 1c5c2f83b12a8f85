//! Task model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest accepted difficulty.
pub const MIN_DIFFICULTY: u8 = 1;
/// Highest accepted difficulty.
pub const MAX_DIFFICULTY: u8 = 5;

/// One unit of work to be ordered.
///
/// Times are in hours; `deadline` is measured from the instant the first
/// task starts. A task is identified by its position in the submitted list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub deadline: f64,
    pub duration: f64,
    pub difficulty: u8,
}

impl Task {
    pub fn new(name: impl Into<String>, duration: f64, deadline: f64, difficulty: u8) -> Self {
        Self {
            name: name.into(),
            deadline,
            duration,
            difficulty,
        }
    }

    /// Checks the task's fields, without reference to its position.
    pub fn validate(&self) -> Result<(), TaskErrorKind> {
        if self.name.trim().is_empty() {
            return Err(TaskErrorKind::EmptyName);
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(TaskErrorKind::NonPositiveDuration(self.duration));
        }
        if !(self.deadline.is_finite() && self.deadline > 0.0) {
            return Err(TaskErrorKind::NonPositiveDeadline(self.deadline));
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty) {
            return Err(TaskErrorKind::DifficultyOutOfRange(self.difficulty));
        }
        Ok(())
    }
}

/// What is wrong with a single task.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskErrorKind {
    #[error("name must not be empty")]
    EmptyName,
    #[error("duration must be a positive number of hours, got {0}")]
    NonPositiveDuration(f64),
    #[error("deadline must be a positive number of hours, got {0}")]
    NonPositiveDeadline(f64),
    #[error("difficulty must be between 1 and 5, got {0}")]
    DifficultyOutOfRange(u8),
}

/// A malformed task in a submitted list.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("task #{index} ({name:?}): {kind}")]
pub struct TaskError {
    pub index: usize,
    pub name: String,
    pub kind: TaskErrorKind,
}

/// Validates every task of a list, reporting the first malformed one.
///
/// An empty list is valid.
pub fn validate_tasks(tasks: &[Task]) -> Result<(), TaskError> {
    for (index, task) in tasks.iter().enumerate() {
        task.validate().map_err(|kind| TaskError {
            index,
            name: task.name.clone(),
            kind,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_task() {
        assert!(Task::new("report", 2.0, 4.0, 3).validate().is_ok());
    }

    #[test]
    fn test_invalid_fields() {
        assert_eq!(
            Task::new("  ", 1.0, 1.0, 1).validate(),
            Err(TaskErrorKind::EmptyName)
        );
        assert_eq!(
            Task::new("a", 0.0, 1.0, 1).validate(),
            Err(TaskErrorKind::NonPositiveDuration(0.0))
        );
        assert!(matches!(
            Task::new("a", f64::NAN, 1.0, 1).validate(),
            Err(TaskErrorKind::NonPositiveDuration(_))
        ));
        assert_eq!(
            Task::new("a", 1.0, -2.0, 1).validate(),
            Err(TaskErrorKind::NonPositiveDeadline(-2.0))
        );
        assert_eq!(
            Task::new("a", 1.0, 1.0, 0).validate(),
            Err(TaskErrorKind::DifficultyOutOfRange(0))
        );
        assert_eq!(
            Task::new("a", 1.0, 1.0, 6).validate(),
            Err(TaskErrorKind::DifficultyOutOfRange(6))
        );
    }

    #[test]
    fn test_validate_tasks_reports_first_bad_index() {
        let tasks = vec![
            Task::new("ok", 1.0, 2.0, 2),
            Task::new("bad", -1.0, 2.0, 2),
            Task::new("", 1.0, 2.0, 2),
        ];
        let err = validate_tasks(&tasks).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.name, "bad");
        assert!(err.to_string().contains("task #1"));
        assert!(validate_tasks(&[]).is_ok());
    }

    #[test]
    fn test_deserialize_store_record() {
        let task: Task = serde_json::from_str(
            r#"{"name": "Essay", "deadline": 5, "duration": 1.5, "difficulty": 4}"#,
        )
        .unwrap();
        assert_eq!(task, Task::new("Essay", 1.5, 5.0, 4));
    }
}
