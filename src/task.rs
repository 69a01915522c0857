// Task data model

use crate::error::TaskError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum task text length in UTF-16 code units, measured after trimming
pub const MAX_TEXT_LEN: usize = 100;

/// One to-do item
///
/// Serialized with camelCase field names and RFC 3339 timestamps, e.g.
/// `{"id":1,"text":"Buy milk","completed":false,"createdAt":"...","completedAt":null}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task. `text` must already be validated.
    pub(crate) fn new(id: u64, text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            completed: false,
            created_at,
            completed_at: None,
        }
    }

    /// Flip the completion state, stamping or clearing `completed_at`
    pub(crate) fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.completed_at = if self.completed { Some(now) } else { None };
    }

    /// Whether `completed_at` agrees with `completed`
    pub fn is_consistent(&self) -> bool {
        self.completed == self.completed_at.is_some()
    }
}

/// Trim and check task text, returning the text to store
pub fn validate_text(text: &str) -> Result<String, TaskError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyInput);
    }

    let len = text_len(trimmed);
    if len > MAX_TEXT_LEN {
        return Err(TaskError::TooLong {
            len,
            max: MAX_TEXT_LEN,
        });
    }

    Ok(trimmed.to_string())
}

/// Length as UTF-16 code units, so characters outside the BMP count twice
pub fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Current UTC time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
