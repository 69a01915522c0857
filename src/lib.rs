// TaskFlow - personal task list with a durable key-value backed task store

pub mod backend;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use backend::{Backend, FileBackend, MemoryBackend, SqliteBackend};
pub use error::TaskError;
pub use filter::TaskFilter;
pub use store::{Applied, Stats, TaskStore};
pub use task::{MAX_TEXT_LEN, Task};
