// Command-line view: turns subcommands into task store calls and renders results

use crate::backend::Backend;
use crate::config::BackendKind;
use crate::error::TaskError;
use crate::filter::TaskFilter;
use crate::store::{Applied, TaskStore};
use crate::task::{MAX_TEXT_LEN, Task};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "taskflow")]
#[command(about = "TaskFlow - a personal task list that survives restarts")]
#[command(version = env!("GIT_DESCRIBE"))]
pub struct Cli {
    /// Directory holding the task store (default: platform data dir)
    #[arg(short, long)]
    pub store_path: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(short, long)]
    pub backend: Option<BackendKind>,

    /// Config file (default: <store-path>/taskflow.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Add a task
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List tasks, newest first
    List {
        /// Which tasks to show: all, completed or pending
        #[arg(short, long, default_value = "all")]
        filter: TaskFilter,
    },

    /// Mark a task completed, or pending again
    Toggle { id: u64 },

    /// Replace a task's text
    Edit {
        id: u64,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Delete a task
    Delete {
        id: u64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete every task
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show task counts
    Stats,
}

/// Execute one command against the store
///
/// Validation and lookup failures are shown as messages, not returned as
/// errors. Only I/O errors on `out`/`input` propagate.
pub fn run<B, W, R>(command: Commands, store: &mut TaskStore<B>, out: &mut W, input: &mut R) -> Result<()>
where
    B: Backend,
    W: Write,
    R: BufRead,
{
    match command {
        Commands::Add { text } => match store.add_task(&text.join(" ")) {
            Ok(applied) => {
                let id = applied.value().id;
                success(out, &format!("Task added successfully! (#{})", id))?;
                report_persist(out, &applied)?;
            }
            Err(e) => advise(out, &e, "Please enter a task!")?,
        },

        Commands::List { filter } => {
            store.set_filter(filter);
            render_tabs(out, store)?;

            let tasks = store.filtered_tasks();
            if tasks.is_empty() {
                let (title, hint) = empty_message(filter);
                writeln!(out, "{}", title.bold())?;
                writeln!(out, "{}", hint.dimmed())?;
            } else {
                for task in tasks {
                    render_task(out, task)?;
                }
            }
        }

        Commands::Toggle { id } => match store.toggle_task(id) {
            Ok(applied) => {
                if applied.value().completed {
                    success(out, "Task completed!")?;
                } else {
                    info(out, "Task marked as pending")?;
                }
                report_persist(out, &applied)?;
            }
            Err(e) => advise(out, &e, "")?,
        },

        Commands::Edit { id, text } => match store.edit_task(id, &text.join(" ")) {
            Ok(applied) => {
                success(out, "Task updated!")?;
                report_persist(out, &applied)?;
            }
            Err(e) => advise(out, &e, "Task cannot be empty!")?,
        },

        Commands::Delete { id, yes } => {
            if store.get(id).is_none() {
                return advise(out, &TaskError::NotFound(id), "");
            }
            if !yes && !confirm(out, input, "Are you sure you want to delete this task?")? {
                return info(out, "Cancelled");
            }

            let applied = store.delete_task(id);
            info(out, "Task deleted!")?;
            report_persist(out, &applied)?;
        }

        Commands::Clear { yes } => {
            let count = store.len();
            if count == 0 {
                return info(out, "No tasks to clear!");
            }
            let prompt = format!("Are you sure you want to delete all {} tasks?", count);
            if !yes && !confirm(out, input, &prompt)? {
                return info(out, "Cancelled");
            }

            let applied = store.clear_all();
            info(out, "All tasks cleared!")?;
            report_persist(out, &applied)?;
        }

        Commands::Stats => {
            let stats = store.stats();
            writeln!(out, "{:<10}{}", "Total", stats.total.to_string().bold())?;
            writeln!(out, "{:<10}{}", "Completed", stats.completed.to_string().green())?;
            writeln!(out, "{:<10}{}", "Pending", stats.pending.to_string().yellow())?;
        }
    }

    Ok(())
}

/// End the session, reporting a failed final flush
pub fn finish<B: Backend, W: Write>(store: TaskStore<B>, out: &mut W) -> Result<()> {
    match store.close() {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(error = %e, "Final flush failed");
            advise(out, &e, "")
        }
    }
}

/// Ask a yes/no question; anything but y/yes is a no
pub fn confirm<W: Write, R: BufRead>(out: &mut W, input: &mut R, prompt: &str) -> Result<bool> {
    write!(out, "{} [y/N] ", prompt)?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn render_tabs<B: Backend, W: Write>(out: &mut W, store: &TaskStore<B>) -> Result<()> {
    let tabs: Vec<String> = TaskFilter::ALL
        .iter()
        .map(|&f| {
            let label = format!("{} ({})", tab_label(f), store.count_for(f));
            if f == store.filter() {
                label.bold().underline().to_string()
            } else {
                label.dimmed().to_string()
            }
        })
        .collect();
    writeln!(out, "{}", tabs.join("  "))?;
    Ok(())
}

fn render_task<W: Write>(out: &mut W, task: &Task) -> Result<()> {
    if task.completed {
        writeln!(out, "{} {:>4}  {}", "[x]".green(), format!("#{}", task.id), task.text.strikethrough())?;
    } else {
        writeln!(out, "{} {:>4}  {}", "[ ]", format!("#{}", task.id), task.text)?;
    }
    Ok(())
}

fn tab_label(filter: TaskFilter) -> &'static str {
    match filter {
        TaskFilter::All => "All",
        TaskFilter::Completed => "Completed",
        TaskFilter::Pending => "Pending",
    }
}

fn empty_message(filter: TaskFilter) -> (&'static str, &'static str) {
    match filter {
        TaskFilter::All => ("No tasks yet", "Add your first task to get started!"),
        TaskFilter::Completed => ("No completed tasks", "Complete some tasks to see them here!"),
        TaskFilter::Pending => ("No pending tasks", "Great job! All tasks are completed!"),
    }
}

fn success<W: Write>(out: &mut W, message: &str) -> Result<()> {
    writeln!(out, "{}", message.green())?;
    Ok(())
}

fn info<W: Write>(out: &mut W, message: &str) -> Result<()> {
    writeln!(out, "{}", message.blue())?;
    Ok(())
}

/// Show a rejected operation. `empty_text` is the wording for `EmptyInput`.
fn advise<W: Write>(out: &mut W, err: &TaskError, empty_text: &str) -> Result<()> {
    let message = match err {
        TaskError::EmptyInput => empty_text.to_string(),
        TaskError::TooLong { .. } => format!("Task is too long! Maximum {} characters.", MAX_TEXT_LEN),
        TaskError::NotFound(id) => format!("Task not found: #{}", id),
        TaskError::IdsExhausted => "No more task ids available!".to_string(),
        TaskError::Persistence(_) => "Failed to save tasks!".to_string(),
    };

    if err.is_validation() {
        writeln!(out, "{}", message.yellow())?;
    } else {
        writeln!(out, "{}", message.red())?;
    }
    Ok(())
}

fn report_persist<W: Write, T>(out: &mut W, applied: &Applied<T>) -> Result<()> {
    if let Some(err) = applied.persist_error() {
        advise(out, err, "")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use std::io::Cursor;

    fn exec(store: &mut TaskStore<MemoryBackend>, command: Commands, input: &str) -> String {
        let mut out = Vec::new();
        let mut input = Cursor::new(input.as_bytes().to_vec());
        run(command, store, &mut out, &mut input).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn strip_ansi(text: &str) -> String {
        let mut plain = String::with_capacity(text.len());
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\u{1b}' {
                // Skip to the end of the escape sequence
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                plain.push(c);
            }
        }
        plain
    }

    fn add(store: &mut TaskStore<MemoryBackend>, text: &str) -> String {
        exec(
            store,
            Commands::Add {
                text: text.split(' ').map(String::from).collect(),
            },
            "",
        )
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from(["taskflow", "add", "Buy", "milk"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Add {
                text: vec!["Buy".to_string(), "milk".to_string()]
            }
        );

        let cli = Cli::try_parse_from(["taskflow", "-b", "files", "-vv", "list", "--filter", "pending"]).unwrap();
        assert_eq!(cli.backend, Some(BackendKind::Files));
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.command,
            Commands::List {
                filter: TaskFilter::Pending
            }
        );

        let cli = Cli::try_parse_from(["taskflow", "list"]).unwrap();
        assert_eq!(cli.command, Commands::List { filter: TaskFilter::All });

        assert!(Cli::try_parse_from(["taskflow", "list", "--filter", "archived"]).is_err());
        assert!(Cli::try_parse_from(["taskflow", "add"]).is_err());
        assert!(Cli::try_parse_from(["taskflow", "toggle", "abc"]).is_err());
    }

    #[test]
    fn test_add_and_list() {
        let mut store = TaskStore::open(MemoryBackend::new());

        let output = add(&mut store, "Buy milk");
        assert!(output.contains("Task added successfully! (#1)"));
        add(&mut store, "Walk dog");

        let output = exec(&mut store, Commands::List { filter: TaskFilter::All }, "");
        let dog = output.find("Walk dog").unwrap();
        let milk = output.find("Buy milk").unwrap();
        assert!(dog < milk);
        assert!(output.contains("All (2)"));
    }

    #[test]
    fn test_add_rejections_are_messages() {
        let mut store = TaskStore::open(MemoryBackend::new());

        let output = exec(&mut store, Commands::Add { text: vec!["   ".to_string()] }, "");
        assert!(output.contains("Please enter a task!"));

        let output = exec(&mut store, Commands::Add { text: vec!["x".repeat(101)] }, "");
        assert!(output.contains("Task is too long! Maximum 100 characters."));

        assert!(store.is_empty());
    }

    #[test]
    fn test_list_empty_messages() {
        let mut store = TaskStore::open(MemoryBackend::new());

        let output = exec(&mut store, Commands::List { filter: TaskFilter::All }, "");
        assert!(output.contains("No tasks yet"));

        add(&mut store, "Buy milk");
        let output = exec(&mut store, Commands::List { filter: TaskFilter::Completed }, "");
        assert!(output.contains("No completed tasks"));
        assert_eq!(store.filter(), TaskFilter::Completed);

        exec(&mut store, Commands::Toggle { id: 1 }, "");
        let output = exec(&mut store, Commands::List { filter: TaskFilter::Pending }, "");
        assert!(output.contains("No pending tasks"));
    }

    #[test]
    fn test_toggle_and_edit() {
        let mut store = TaskStore::open(MemoryBackend::new());
        add(&mut store, "Buy milk");

        let output = exec(&mut store, Commands::Toggle { id: 1 }, "");
        assert!(output.contains("Task completed!"));
        let output = exec(&mut store, Commands::Toggle { id: 1 }, "");
        assert!(output.contains("Task marked as pending"));

        let output = exec(
            &mut store,
            Commands::Edit {
                id: 1,
                text: vec!["Buy".to_string(), "bread".to_string()],
            },
            "",
        );
        assert!(output.contains("Task updated!"));
        assert_eq!(store.get(1).unwrap().text, "Buy bread");

        let output = exec(&mut store, Commands::Edit { id: 1, text: vec![" ".to_string()] }, "");
        assert!(output.contains("Task cannot be empty!"));

        let output = exec(&mut store, Commands::Toggle { id: 9 }, "");
        assert!(output.contains("Task not found: #9"));
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut store = TaskStore::open(MemoryBackend::new());
        add(&mut store, "Buy milk");

        let output = exec(&mut store, Commands::Delete { id: 1, yes: false }, "n\n");
        assert!(output.contains("Are you sure you want to delete this task?"));
        assert!(output.contains("Cancelled"));
        assert_eq!(store.len(), 1);

        let output = exec(&mut store, Commands::Delete { id: 1, yes: false }, "y\n");
        assert!(output.contains("Task deleted!"));
        assert!(store.is_empty());

        let output = exec(&mut store, Commands::Delete { id: 1, yes: true }, "");
        assert!(output.contains("Task not found: #1"));
    }

    #[test]
    fn test_clear() {
        let mut store = TaskStore::open(MemoryBackend::new());

        let output = exec(&mut store, Commands::Clear { yes: true }, "");
        assert!(output.contains("No tasks to clear!"));

        add(&mut store, "Buy milk");
        add(&mut store, "Walk dog");

        // EOF counts as no
        let output = exec(&mut store, Commands::Clear { yes: false }, "");
        assert!(output.contains("delete all 2 tasks?"));
        assert_eq!(store.len(), 2);

        let output = exec(&mut store, Commands::Clear { yes: false }, "yes\n");
        assert!(output.contains("All tasks cleared!"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_stats() {
        let mut store = TaskStore::open(MemoryBackend::new());
        add(&mut store, "Buy milk");
        add(&mut store, "Walk dog");
        exec(&mut store, Commands::Toggle { id: 2 }, "");

        let output = strip_ansi(&exec(&mut store, Commands::Stats, ""));
        let line = |label: &str| {
            output
                .lines()
                .find(|l| l.starts_with(label))
                .unwrap()
                .trim_start_matches(label)
                .to_string()
        };
        assert_eq!(line("Total").trim(), "2");
        assert_eq!(line("Completed").trim(), "1");
        assert_eq!(line("Pending").trim(), "1");
    }

    #[test]
    fn test_finish_reports_failed_flush() {
        let mut store = TaskStore::open(MemoryBackend::new());
        store.backend_mut().set_unavailable(true);
        add(&mut store, "Buy milk");

        let mut out = Vec::new();
        finish(store, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Failed to save tasks!"));
    }

    #[test]
    fn test_finish_is_quiet_when_saved() {
        let mut store = TaskStore::open(MemoryBackend::new());
        add(&mut store, "Buy milk");

        let mut out = Vec::new();
        finish(store, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_add_reports_exhausted_ids() {
        let mut store = TaskStore::open(MemoryBackend::with_entries([(
            crate::codec::COUNTER_KEY,
            "18446744073709551615",
        )]));

        let output = add(&mut store, "Buy milk");
        assert!(output.contains("No more task ids available!"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_persist_failure_is_reported() {
        let mut store = TaskStore::open(MemoryBackend::new());
        store.backend_mut().set_unavailable(true);

        let output = add(&mut store, "Buy milk");
        assert!(output.contains("Task added successfully!"));
        assert!(output.contains("Failed to save tasks!"));
        assert_eq!(store.len(), 1);
    }
}
