//! agentcore - autonomous agent runtime
//!
//! CLI entry point: starts the HTTP server, plans and runs a task
//! directly, or inspects tasks already in the store.

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use agentcore::cli::{Cli, Command, TaskCommand};
use agentcore::config::Config;
use agentcore::domain::TaskStatus;
use agentcore::http::{self, AppState};
use agentcore::notify::InMemoryNotificationChannel;
use agentcore::planning::TaskPlanner;
use agentcore::state::StateManager;
use agentcore::tools::ToolExecutor;
use agentcore::{llm, PlanExecutor};

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(provider = %config.llm.provider, model = %config.llm.model, "agentcore starting");

    let state = StateManager::spawn(&config.storage.taskstore_dir).context("Failed to start state manager")?;
    let mut tools = ToolExecutor::standard();
    tools.load_tools_from_directory(config.tool_plugin_dir.as_deref());
    let tools = Arc::new(tools);

    let llm_client = llm::create_client(&config.llm).context("Failed to create LLM client")?;
    let planner = Arc::new(TaskPlanner::new(llm_client, state.clone(), tools.clone()));
    let notify = Arc::new(InMemoryNotificationChannel::new());
    let workdir = std::env::current_dir().context("Failed to resolve working directory")?;
    let executor = Arc::new(PlanExecutor::new(state.clone(), tools.clone(), notify, workdir));

    match cli.command {
        None => {
            let app_state = AppState::new(state, planner, executor);
            let router = http::router(app_state);

            let addr = format!("{}:{}", config.http.host, config.http.port);
            info!(%addr, "listening");
            let listener = tokio::net::TcpListener::bind(&addr).await.context("Failed to bind HTTP listener")?;
            axum::serve(listener, router).await.context("HTTP server failed")?;
        }

        Some(Command::Serve { host, port }) => {
            let host = host.unwrap_or(config.http.host);
            let port = port.unwrap_or(config.http.port);

            let app_state = AppState::new(state, planner, executor);
            let router = http::router(app_state);

            let addr = format!("{host}:{port}");
            info!(%addr, "listening");
            let listener = tokio::net::TcpListener::bind(&addr).await.context("Failed to bind HTTP listener")?;
            axum::serve(listener, router).await.context("HTTP server failed")?;
        }

        Some(Command::Plan { description }) => {
            let main_task = planner.plan_task(&description).await?;
            if main_task.status == TaskStatus::Planned {
                let finished = executor.execute(&main_task.id, tokio_util::sync::CancellationToken::new()).await?;
                println!("{}", serde_json::to_string_pretty(&finished)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&main_task)?);
            }
        }

        Some(Command::Task(TaskCommand::Get { id })) => {
            let task = state.get_task(&id).await?;
            match task {
                Some(task) => println!("{}", serde_json::to_string_pretty(&task)?),
                None => eprintln!("task '{id}' not found"),
            }
        }

        Some(Command::Task(TaskCommand::List { status })) => {
            let tasks = match status {
                Some(status) => state.get_tasks_by_status(parse_status(&status)?).await?,
                None => state.get_all_tasks().await?,
            };
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }

        Some(Command::Task(TaskCommand::Delete { id })) => {
            state.delete_task(&id).await?;
            println!("deleted {id}");
        }
    }

    Ok(())
}

fn parse_status(s: &str) -> Result<TaskStatus> {
    match s {
        "pending" => Ok(TaskStatus::Pending),
        "pending_planning" => Ok(TaskStatus::PendingPlanning),
        "planned" => Ok(TaskStatus::Planned),
        "running" => Ok(TaskStatus::Running),
        "completed" => Ok(TaskStatus::Completed),
        "failed" => Ok(TaskStatus::Failed),
        "cancelled" => Ok(TaskStatus::Cancelled),
        "planning_failed" => Ok(TaskStatus::PlanningFailed),
        other => Err(eyre::eyre!("unknown status '{other}'")),
    }
}
