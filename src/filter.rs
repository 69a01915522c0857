// View filter over the task collection

use crate::task::Task;
use std::str::FromStr;

/// Which tasks a view shows. Session-only; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl TaskFilter {
    pub const ALL: [TaskFilter; 3] = [TaskFilter::All, TaskFilter::Completed, TaskFilter::Pending];

    /// Whether a task is shown under this filter
    pub fn matches(self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Completed => task.completed,
            TaskFilter::Pending => !task.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Completed => "completed",
            TaskFilter::Pending => "pending",
        }
    }
}

impl std::fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "completed" | "done" => Ok(TaskFilter::Completed),
            "pending" | "active" => Ok(TaskFilter::Pending),
            other => Err(format!(
                "Invalid filter: {} (expected all, completed or pending)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::now;

    fn task(id: u64, completed: bool) -> Task {
        let mut t = Task::new(id, format!("Task {}", id), now());
        if completed {
            t.toggle(now());
        }
        t
    }

    #[test]
    fn test_filter_default_is_all() {
        assert_eq!(TaskFilter::default(), TaskFilter::All);
    }

    #[test]
    fn test_filter_matches() {
        let done = task(1, true);
        let open = task(2, false);

        assert!(TaskFilter::All.matches(&done));
        assert!(TaskFilter::All.matches(&open));
        assert!(TaskFilter::Completed.matches(&done));
        assert!(!TaskFilter::Completed.matches(&open));
        assert!(TaskFilter::Pending.matches(&open));
        assert!(!TaskFilter::Pending.matches(&done));
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!("all".parse::<TaskFilter>().unwrap(), TaskFilter::All);
        assert_eq!("Completed".parse::<TaskFilter>().unwrap(), TaskFilter::Completed);
        assert_eq!("pending".parse::<TaskFilter>().unwrap(), TaskFilter::Pending);
        assert!("archived".parse::<TaskFilter>().is_err());
    }

    #[test]
    fn test_filter_display_round_trips() {
        for filter in TaskFilter::ALL {
            assert_eq!(filter.to_string().parse::<TaskFilter>().unwrap(), filter);
        }
    }
}
