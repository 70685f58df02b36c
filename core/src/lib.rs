//! agentcore - an autonomous agent runtime
//!
//! A task description goes in; the Task Planner decomposes it into a main
//! task and a sequence of subtasks, the Plan Executor runs each subtask
//! against its assigned tool, and the Response Processor turns LLM output
//! into a stream of events along the way. All state is durable: tasks
//! survive a restart because the state manager rebuilds its index from the
//! `taskstore` log on startup.
//!
//! # Modules
//!
//! - [`domain`] - `Task`, `Event`, `ToolInvocation` - the entities everything
//!   else operates on
//! - [`state`] - the actor that owns the task store
//! - [`planning`] - decomposes a task description into subtasks
//! - [`executor`] - runs a planned task's subtasks
//! - [`response`] - turns LLM output into events, dispatching tool calls
//! - [`tools`] - the tool registry and the builtin tools themselves
//! - [`llm`] - the LLM client trait and Anthropic implementation
//! - [`notify`] - in-process event delivery
//! - [`http`] - the axum HTTP surface
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod executor;
pub mod http;
pub mod llm;
pub mod notify;
pub mod planning;
pub mod response;
pub mod state;
pub mod tools;

pub use config::{Config, LlmConfig};
pub use domain::{Event, Filter, FilterOp, IndexValue, InvocationStatus, Record, Store, Task, TaskCreate, TaskStatus, TaskUpdate, ToolInvocation};
pub use executor::{ExecutorError, PlanExecutor};
pub use llm::{create_client, AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError};
pub use notify::{InMemoryNotificationChannel, NotificationChannel};
pub use planning::{PlanError, TaskPlanner};
pub use response::{InlineMarkupResultStrategy, ResponseProcessor, ResponseProcessorConfig};
pub use state::{StateCommand, StateError, StateManager, StateResponse};
pub use tools::{Tool, ToolContext, ToolError, ToolExecutor, ToolResult};
