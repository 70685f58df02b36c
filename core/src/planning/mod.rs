//! Planning module - decomposes a task description into executable subtasks.
//!
//! # Architecture
//!
//! ```text
//! Task description → TaskPlanner → main Task + subtasks → StateManager
//! ```
//!
//! `TaskPlanner` drives a single LLM call (with retries on malformed output)
//! that decomposes a task description into a sequence of tool invocations,
//! then persists the main task and its subtasks through the `StateManager`.

mod decomposer;

pub use decomposer::{PlanError, TaskPlanner};
