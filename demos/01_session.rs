//! Demo 01: A Task Session
//!
//! Walks through adding, completing, filtering and deleting tasks, then
//! reopens the store to show that state and the id sequence survive.
//!
//! Run with: cargo run --example 01_session

use eyre::Result;
use taskflow::{SqliteBackend, TaskFilter, TaskStore};

fn main() -> Result<()> {
    // Create a temporary directory for this demo
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("taskflow.db");

    println!("TaskFlow Session Demo");
    println!("=====================\n");

    let mut store = TaskStore::open(SqliteBackend::open(&db_path)?);

    println!("1. ADD - three tasks, newest first...");
    for text in ["Buy milk", "Walk dog", "Pay bills"] {
        let task = store.add_task(text)?.into_value();
        println!("   #{} {}", task.id, task.text);
    }

    println!("\n2. VALIDATE - empty and over-long text are rejected...");
    if let Err(e) = store.add_task("   ") {
        println!("   {}", e);
    }
    if let Err(e) = store.add_task(&"x".repeat(101)) {
        println!("   {}", e);
    }

    println!("\n3. TOGGLE - complete 'Buy milk'...");
    let task = store.toggle_task(1)?.into_value();
    println!("   #{} completed at {:?}", task.id, task.completed_at);

    println!("\n4. FILTER - pending tasks only...");
    store.set_filter(TaskFilter::Pending);
    for task in store.filtered_tasks() {
        println!("   #{} {}", task.id, task.text);
    }

    println!("\n5. DELETE - remove 'Pay bills' (#3)...");
    let removed = store.delete_task(3).into_value();
    println!("   removed: {}", removed);

    let stats = store.stats();
    println!(
        "\n   total={} completed={} pending={}",
        stats.total, stats.completed, stats.pending
    );
    store.close()?;

    println!("\n6. REOPEN - ids are never reused...");
    let mut store = TaskStore::open(SqliteBackend::open(&db_path)?);
    println!("   restored {} tasks, next id {}", store.len(), store.next_id());
    let task = store.add_task("Call mom")?.into_value();
    println!("   new task gets #{}", task.id);

    println!("\nDemo complete!");
    Ok(())
}
