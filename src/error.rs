// Error types for task store operations

use thiserror::Error;

/// Errors returned by [`TaskStore`](crate::TaskStore) operations
///
/// Every variant is recoverable. Validation errors are returned before any
/// state changes; `Persistence` is reported after the in-memory change has
/// already been applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Task text cannot be empty")]
    EmptyInput,

    #[error("Task text is too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("Task not found: {0}")]
    NotFound(u64),

    #[error("No task ids left to issue")]
    IdsExhausted,

    #[error("Failed to persist tasks: {0}")]
    Persistence(String),
}

impl TaskError {
    /// Wrap a backend error, keeping its full context chain in the message
    pub fn persistence(err: &eyre::Report) -> Self {
        TaskError::Persistence(format!("{:#}", err))
    }

    /// True for errors caused by bad user input rather than store state
    pub fn is_validation(&self) -> bool {
        matches!(self, TaskError::EmptyInput | TaskError::TooLong { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(TaskError::EmptyInput.to_string(), "Task text cannot be empty");
        assert_eq!(
            TaskError::TooLong { len: 101, max: 100 }.to_string(),
            "Task text is too long: 101 characters (max 100)"
        );
        assert_eq!(TaskError::NotFound(7).to_string(), "Task not found: 7");
        assert_eq!(TaskError::IdsExhausted.to_string(), "No task ids left to issue");
    }

    #[test]
    fn test_persistence_keeps_context() {
        let report = eyre::eyre!("disk full").wrap_err("Failed to write key");
        let err = TaskError::persistence(&report);
        assert_eq!(err, TaskError::Persistence("Failed to write key: disk full".to_string()));
    }

    #[test]
    fn test_is_validation() {
        assert!(TaskError::EmptyInput.is_validation());
        assert!(TaskError::TooLong { len: 101, max: 100 }.is_validation());
        assert!(!TaskError::NotFound(1).is_validation());
        assert!(!TaskError::Persistence("x".to_string()).is_validation());
    }
}
