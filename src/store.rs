// Task store: in-memory task collection synchronized with a key-value backend

use crate::backend::Backend;
use crate::codec;
use crate::error::TaskError;
use crate::filter::TaskFilter;
use crate::task::{self, Task};
use tracing::{debug, info, warn};

/// Derived task counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

/// Result of a mutation that has been applied in memory
///
/// The mutation stands whether or not it reached the backend.
/// `persist_error()` tells the caller when durability failed so it can
/// warn the user.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Applied<T> {
    value: T,
    persist_error: Option<TaskError>,
}

impl<T> Applied<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn persist_error(&self) -> Option<&TaskError> {
        self.persist_error.as_ref()
    }

    /// True if the change was written to the backend
    pub fn is_durable(&self) -> bool {
        self.persist_error.is_none()
    }

}

/// Owner of the task list, the id sequence and the active filter
///
/// Construct one per session with [`TaskStore::open`] and drive every change
/// through its methods. Returned tasks are read-only views.
pub struct TaskStore<B: Backend> {
    backend: B,
    tasks: Vec<Task>,
    next_id: u64,
    filter: TaskFilter,
    unsaved: bool,
}

impl<B: Backend> TaskStore<B> {
    /// Restore a store from a backend
    ///
    /// Missing or corrupt data gives an empty store; this never fails.
    pub fn open(backend: B) -> Self {
        let snapshot = codec::load(&backend);
        Self {
            backend,
            tasks: snapshot.tasks,
            next_id: snapshot.next_id,
            filter: TaskFilter::default(),
            unsaved: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Give up the store, returning its backend without a final flush
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// All tasks, newest first
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// The id the next added task will get
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// True if a mutation has not reached the backend yet
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a task at the front of the list
    pub fn add_task(&mut self, text: &str) -> Result<Applied<Task>, TaskError> {
        let text = task::validate_text(text)?;

        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(TaskError::IdsExhausted)?;

        let task = Task::new(id, text, task::now());
        self.tasks.insert(0, task.clone());
        debug!(id, "add_task: added");

        Ok(self.commit(task))
    }

    /// Flip a task between completed and pending
    pub fn toggle_task(&mut self, id: u64) -> Result<Applied<Task>, TaskError> {
        let task = self.find_mut(id)?;
        task.toggle(task::now());
        let task = task.clone();
        debug!(id, completed = task.completed, "toggle_task: toggled");

        Ok(self.commit(task))
    }

    /// Replace a task's text, leaving its state and timestamps alone
    pub fn edit_task(&mut self, id: u64, new_text: &str) -> Result<Applied<Task>, TaskError> {
        let text = task::validate_text(new_text)?;

        let task = self.find_mut(id)?;
        task.text = text;
        let task = task.clone();
        debug!(id, "edit_task: updated");

        Ok(self.commit(task))
    }

    /// Remove a task, returning whether one was removed
    ///
    /// The id is never issued again. Nothing is written when no task matched.
    pub fn delete_task(&mut self, id: u64) -> Applied<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);

        if self.tasks.len() == before {
            debug!(id, "delete_task: no such task");
            return Applied {
                value: false,
                persist_error: None,
            };
        }

        debug!(id, "delete_task: removed");
        self.commit(true)
    }

    /// Remove every task, returning how many were removed
    ///
    /// Nothing is written when the store was already empty.
    pub fn clear_all(&mut self) -> Applied<usize> {
        let count = self.tasks.len();
        if count == 0 {
            return Applied {
                value: 0,
                persist_error: None,
            };
        }

        self.tasks.clear();
        info!(count, "clear_all: removed all tasks");
        self.commit(count)
    }

    // ========================================================================
    // Filtering and stats
    // ========================================================================

    /// Change the active filter. Not persisted.
    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    /// Tasks matching the active filter, newest first
    pub fn filtered_tasks(&self) -> Vec<&Task> {
        self.tasks_for(self.filter)
    }

    /// Tasks matching any filter, newest first
    pub fn tasks_for(&self, filter: TaskFilter) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t)).collect()
    }

    /// Number of tasks a filter would show
    pub fn count_for(&self, filter: TaskFilter) -> usize {
        self.tasks.iter().filter(|t| filter.matches(t)).count()
    }

    pub fn stats(&self) -> Stats {
        let total = self.tasks.len();
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        Stats {
            total,
            completed,
            pending: total - completed,
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write all tasks and the id counter to the backend
    ///
    /// In-memory state is left as is on failure.
    pub fn persist(&mut self) -> Result<(), TaskError> {
        codec::save(&mut self.backend, &self.tasks, self.next_id).map_err(|e| {
            warn!(error = ?e, "Failed to persist tasks");
            TaskError::persistence(&e)
        })?;

        self.unsaved = false;
        Ok(())
    }

    /// Write again only if an earlier persist failed
    pub fn flush(&mut self) -> Result<(), TaskError> {
        if self.unsaved {
            self.persist()?;
        }
        Ok(())
    }

    /// End the session with a final flush
    pub fn close(mut self) -> Result<(), TaskError> {
        self.flush()?;
        info!(count = self.tasks.len(), next_id = self.next_id, "Task store closed");
        Ok(())
    }

    fn commit<T>(&mut self, value: T) -> Applied<T> {
        self.unsaved = true;
        Applied {
            value,
            persist_error: self.persist().err(),
        }
    }

    fn find_mut(&mut self, id: u64) -> Result<&mut Task, TaskError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))
    }
}
