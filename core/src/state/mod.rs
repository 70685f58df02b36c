//! State management with actor pattern
//!
//! StateManager owns the TaskStore and processes messages via channels,
//! providing thread-safe access to persistent state. Tasks are durable
//! across restarts: `StateManager::spawn` rebuilds the in-memory index from
//! the JSONL log before the actor starts accepting commands.

mod manager;
mod messages;

pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse};
