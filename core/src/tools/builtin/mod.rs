//! Built-in tools for the agent runtime

mod complete_task;
mod edit_file;
mod fetch;
mod glob;
mod grep;
mod list_directory;
mod read_file;
mod run_command;
mod search;
mod todo;
mod tree;
mod write_file;

pub use complete_task::CompleteTaskTool;
pub use edit_file::EditFileTool;
pub use fetch::FetchTool;
pub use glob::GlobTool;
pub use grep::GrepTool;
pub use list_directory::ListDirectoryTool;
pub use read_file::ReadFileTool;
pub use run_command::RunCommandTool;
pub use search::{SearchConfig, SearchTool};
pub use todo::{TodoItem, TodoList, TodoStatus, TodoTool, new_todo_list};
pub use tree::TreeTool;
pub use write_file::WriteFileTool;
