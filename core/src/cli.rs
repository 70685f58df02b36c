//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// agentcore - an autonomous agent runtime
#[derive(Parser)]
#[command(
    name = "agentcore",
    about = "Autonomous agent runtime: plan a task, run it, inspect the result",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs go to stderr; set RUST_LOG to control verbosity."
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Host to bind to, overriding config
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to, overriding config
        #[arg(long)]
        port: Option<u16>,
    },

    /// Plan a task description into subtasks and run it
    Plan {
        /// Description of the task to plan and execute
        description: String,
    },

    /// Inspect or manage individual tasks
    #[command(subcommand)]
    Task(TaskCommand),
}

/// Task inspection/management subcommands
#[derive(Subcommand)]
pub enum TaskCommand {
    /// Fetch a single task by id
    Get {
        /// Task id
        id: String,
    },

    /// List tasks, optionally filtered by status
    List {
        /// Filter by status (pending, planned, running, completed, failed, cancelled, planning_failed)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Delete a task by id
    Delete {
        /// Task id
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["agentcore"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_serve() {
        let cli = Cli::parse_from(["agentcore", "serve"]);
        assert!(matches!(cli.command, Some(Command::Serve { host: None, port: None })));
    }

    #[test]
    fn test_cli_parse_serve_with_port() {
        let cli = Cli::parse_from(["agentcore", "serve", "--port", "9999"]);
        assert!(matches!(cli.command, Some(Command::Serve { port: Some(9999), .. })));
    }

    #[test]
    fn test_cli_parse_plan() {
        let cli = Cli::parse_from(["agentcore", "plan", "write a haiku"]);
        if let Some(Command::Plan { description }) = cli.command {
            assert_eq!(description, "write a haiku");
        } else {
            panic!("Expected Plan command");
        }
    }

    #[test]
    fn test_cli_parse_task_get() {
        let cli = Cli::parse_from(["agentcore", "task", "get", "abc123"]);
        assert!(matches!(cli.command, Some(Command::Task(TaskCommand::Get { id })) if id == "abc123"));
    }

    #[test]
    fn test_cli_parse_task_list_with_status() {
        let cli = Cli::parse_from(["agentcore", "task", "list", "--status", "failed"]);
        if let Some(Command::Task(TaskCommand::List { status })) = cli.command {
            assert_eq!(status.as_deref(), Some("failed"));
        } else {
            panic!("Expected Task::List command");
        }
    }

    #[test]
    fn test_cli_parse_task_delete() {
        let cli = Cli::parse_from(["agentcore", "task", "delete", "abc123"]);
        assert!(matches!(cli.command, Some(Command::Task(TaskCommand::Delete { id })) if id == "abc123"));
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::parse_from(["agentcore", "-c", "/path/to/config.yaml", "serve"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yaml")));
    }
}
