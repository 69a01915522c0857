// On-store format for tasks and the id counter

use crate::backend::Backend;
use crate::task::{MAX_TEXT_LEN, Task, text_len};
use eyre::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

/// Key holding the JSON array of tasks
pub const TASKS_KEY: &str = "taskflow-tasks";

/// Key holding the next id to issue, as a decimal string
pub const COUNTER_KEY: &str = "taskflow-counter";

/// State restored from a backend
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub next_id: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }
}

/// Serialize tasks as a JSON array
pub fn encode_tasks(tasks: &[Task]) -> Result<String> {
    serde_json::to_string(tasks).context("Failed to serialize tasks")
}

/// Parse the stored task array, never failing
///
/// A value that is not a JSON array yields no tasks. Inside a valid array,
/// entries that do not parse as a task are skipped. Entries that parse but
/// break a task invariant are repaired or dropped:
/// - a repeated id keeps the first occurrence
/// - id `u64::MAX` drops the entry, since no id could follow it
/// - empty or over-long text drops the entry
/// - `completedAt` is cleared on pending tasks and backfilled from
///   `createdAt` on completed ones
pub fn decode_tasks(raw: Option<&str>) -> Vec<Task> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let entries: Vec<Value> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(key = TASKS_KEY, error = ?e, "Failed to parse stored tasks, starting empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let mut task: Task = match serde_json::from_value(entry) {
            Ok(t) => t,
            Err(e) => {
                warn!(key = TASKS_KEY, index, error = ?e, "Failed to parse stored task, skipping");
                continue;
            }
        };

        if task.id == u64::MAX {
            warn!(id = task.id, index, "Stored task id leaves no room for another, skipping");
            continue;
        }

        if !seen.insert(task.id) {
            warn!(id = task.id, index, "Duplicate task id, skipping");
            continue;
        }

        let trimmed = task.text.trim();
        if trimmed.is_empty() || text_len(trimmed) > MAX_TEXT_LEN {
            warn!(id = task.id, index, "Stored task text is empty or too long, skipping");
            continue;
        }
        if trimmed.len() != task.text.len() {
            task.text = trimmed.to_string();
        }

        if !task.is_consistent() {
            warn!(id = task.id, completed = task.completed, "Repairing completedAt");
            task.completed_at = if task.completed { Some(task.created_at) } else { None };
        }

        tasks.push(task);
    }

    tasks
}

/// Parse the stored counter the way a lenient leading-integer parse would
///
/// `"12"` and `" 12abc"` both give 12. Missing, unparseable, out of range
/// or non-positive values give 1.
pub fn decode_counter(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return 1;
    };

    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    let digits = &digits[..end];

    if digits.is_empty() {
        warn!(key = COUNTER_KEY, value = raw, "Failed to parse stored counter, using 1");
        return 1;
    }
    if negative {
        return 1;
    }

    match digits.parse::<u64>() {
        Ok(counter) => counter.max(1),
        Err(e) => {
            warn!(key = COUNTER_KEY, value = raw, error = ?e, "Stored counter out of range, using 1");
            1
        }
    }
}

/// `max(counter, 1 + max id, 1)`
pub fn reconcile_next_id(counter: u64, tasks: &[Task]) -> u64 {
    let after_max = tasks
        .iter()
        .map(|t| t.id.saturating_add(1))
        .max()
        .unwrap_or(1);
    counter.max(after_max).max(1)
}

/// Load tasks and the next id from a backend
///
/// Never fails: read errors and corrupt values fall back to an empty store.
pub fn load<B: Backend + ?Sized>(backend: &B) -> Snapshot {
    let raw_tasks = read_soft(backend, TASKS_KEY);
    let raw_counter = read_soft(backend, COUNTER_KEY);

    let tasks = decode_tasks(raw_tasks.as_deref());
    let counter = decode_counter(raw_counter.as_deref());
    let next_id = reconcile_next_id(counter, &tasks);

    info!(count = tasks.len(), next_id, "Loaded tasks");
    Snapshot { tasks, next_id }
}

/// Write tasks and the next id to a backend in one call
pub fn save<B: Backend + ?Sized>(backend: &mut B, tasks: &[Task], next_id: u64) -> Result<()> {
    let tasks_json = encode_tasks(tasks)?;
    let counter = next_id.to_string();

    backend
        .set_many(&[(TASKS_KEY, tasks_json.as_str()), (COUNTER_KEY, counter.as_str())])
        .context("Failed to save tasks")
}

fn read_soft<B: Backend + ?Sized>(backend: &B, key: &str) -> Option<String> {
    match backend.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = ?e, "Failed to read from backend, using default");
            None
        }
    }
}
