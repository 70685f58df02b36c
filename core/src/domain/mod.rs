//! Domain types for the agent runtime
//!
//! Core domain types: Task, Event, ToolInvocation.
//! `Task` implements the `Record` trait for `taskstore` persistence.

mod event;
mod id;
mod task;

pub use event::{Event, InvocationStatus, ToolInvocation};
pub use id::{generate_id, DomainId, IdResolver};
pub use task::{Task, TaskCreate, TaskStatus, TaskUpdate};

// Re-export taskstore types for convenience
pub use taskstore::{Filter, FilterOp, IndexValue, Record, Store};
