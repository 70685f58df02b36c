//! End-to-end scenarios driving the public API the way a caller assembling
//! `StateManager` + `TaskPlanner` + `ResponseProcessor` + `ToolExecutor`
//! would: no internal module is reached into, and nothing here depends on
//! any `#[cfg(test)]`-only item of `agentcore` itself.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assert_cmd::Command;
use async_trait::async_trait;
use predicates::prelude::*;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use agentcore::{
    CompletionRequest, CompletionResponse, Event, LlmClient, LlmError, ResponseProcessor, ResponseProcessorConfig,
    StateManager, TaskCreate, TaskPlanner, TaskStatus, ToolContext, ToolExecutor, ToolResult,
};
use agentcore::llm::{StopReason, StreamChunk, TokenUsage};
use agentcore::tools::{InlineMarkupSchema, InlineParam, Tool, ToolMethod};

/// Answers `complete` from a fixed script, one response per call, counting
/// how many times it was asked - used where a test needs to assert on call
/// count rather than just the end state. `MockLlmClient` in `agentcore::llm`
/// is only built for the crate's own unit tests, so scenarios under
/// `tests/` need their own.
struct ScriptedLlmClient {
    responses: Vec<CompletionResponse>,
    calls: AtomicUsize,
}

impl ScriptedLlmClient {
    fn new(responses: Vec<CompletionResponse>) -> Self {
        Self { responses, calls: AtomicUsize::new(0) }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses.get(idx).cloned().ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string()))
    }

    async fn stream(&self, request: CompletionRequest, _chunk_tx: mpsc::Sender<StreamChunk>) -> Result<CompletionResponse, LlmError> {
        self.complete(request).await
    }
}

fn json_response(content: &str) -> CompletionResponse {
    CompletionResponse { content: Some(content.to_string()), tool_calls: vec![], stop_reason: StopReason::EndTurn, usage: TokenUsage::default() }
}

/// A stand-in for a sandboxed code-execution tool (`Py__exec`), used to
/// exercise both native tool-call streaming (scenario 3) and a failing
/// inline-markup invocation (scenario 4). Its `exec` method fails whenever
/// `code` is the literal string `raise_exception`, mirroring a tool
/// that raises on bad input rather than returning a normal result.
struct PyTool;

#[async_trait]
impl Tool for PyTool {
    fn tool_id(&self) -> &'static str {
        "Py"
    }

    fn methods(&self) -> Vec<ToolMethod> {
        vec![ToolMethod::new("exec", "executes a snippet of code", json!({"type": "object", "properties": {"code": {"type": "string"}}}))
            .with_inline_markup(InlineMarkupSchema {
                tag_name: "execute_python_code".to_string(),
                params: vec![InlineParam::attribute("code")],
                example: "<execute_python_code code=\"print(1)\"/>".to_string(),
            })]
    }

    async fn call(&self, _method_name: &str, input: Value, _ctx: &ToolContext) -> ToolResult {
        let code = input.get("code").and_then(Value::as_str).unwrap_or_default();
        if code == "raise_exception" {
            ToolResult::error("boom: deliberate failure")
        } else {
            ToolResult::success(format!("ran: {code}"))
        }
    }
}

fn test_ctx() -> ToolContext {
    ToolContext::new_unsandboxed(std::env::temp_dir(), "integration-test".to_string())
}

fn processor_with_py(config: ResponseProcessorConfig) -> ResponseProcessor {
    let mut executor = ToolExecutor::new();
    executor.register_tool(Box::new(PyTool)).unwrap();
    ResponseProcessor::new(Arc::new(executor), config)
}

/// Scenario 2 - three consecutive non-JSON planner responses leave the main
/// task `planning_failed`, stamp the literal failure message, create zero
/// subtasks, and make exactly three LLM calls (no further retries beyond
/// the fixed attempt budget).
#[tokio::test]
async fn planner_exhausts_retries_on_corrupt_json() {
    let temp = tempfile::tempdir().unwrap();
    let state = StateManager::spawn(temp.path()).unwrap();
    let tools = Arc::new(ToolExecutor::standard());
    let llm = Arc::new(ScriptedLlmClient::new(vec![json_response("not json"), json_response("not json"), json_response("not json")]));

    let planner = TaskPlanner::new(llm.clone(), state.clone(), tools);
    let main_task = planner.plan_task("corrupt this plan").await.unwrap();

    assert_eq!(main_task.status, TaskStatus::PlanningFailed);
    assert_eq!(main_task.error.as_deref(), Some("No subtasks generated."));
    assert!(main_task.subtasks.is_empty());
    assert_eq!(llm.call_count(), 3);

    state.shutdown().await.unwrap();
}

/// Scenario 3 - a native tool call whose JSON arguments arrive split across
/// three `ToolUseDelta` chunks still assembles into one well-formed call,
/// yielding exactly one `ToolStarted`, one `ToolCompleted`, and a trailing
/// `Finish`.
#[tokio::test]
async fn streaming_tool_call_with_split_arguments_completes_once() {
    let (tx, rx) = mpsc::channel(16);
    tx.send(StreamChunk::MessageStart { input_tokens: 10 }).await.unwrap();
    tx.send(StreamChunk::ToolUseStart { id: "call-1".to_string(), name: "Py__exec".to_string() }).await.unwrap();
    tx.send(StreamChunk::ToolUseDelta { id: "call-1".to_string(), json_delta: "{\"cod".to_string() }).await.unwrap();
    tx.send(StreamChunk::ToolUseDelta { id: "call-1".to_string(), json_delta: "e\": \"pri".to_string() }).await.unwrap();
    tx.send(StreamChunk::ToolUseDelta { id: "call-1".to_string(), json_delta: "nt(1)\"}".to_string() }).await.unwrap();
    tx.send(StreamChunk::ToolUseEnd { id: "call-1".to_string() }).await.unwrap();
    tx.send(StreamChunk::MessageDone { stop_reason: StopReason::ToolUse, usage: TokenUsage::default() }).await.unwrap();
    drop(tx);

    let processor = processor_with_py(ResponseProcessorConfig::default());
    let events = processor.process_stream(rx, &test_ctx()).await;

    let started: Vec<_> = events.iter().filter(|e| matches!(e, Event::ToolStarted { .. })).collect();
    let completed: Vec<_> = events.iter().filter(|e| matches!(e, Event::ToolCompleted { .. })).collect();
    let finished: Vec<_> = events.iter().filter(|e| matches!(e, Event::Finish { .. })).collect();

    assert_eq!(started.len(), 1);
    assert_eq!(completed.len(), 1);
    assert_eq!(finished.len(), 1);

    let Event::ToolCompleted { result, .. } = completed[0] else { unreachable!() };
    assert_eq!(result, &Value::String("ran: print(1)".to_string()));
}

/// Scenario 4 - an inline-markup tag that fails still reaches `ToolStarted`
/// then `ToolFailed` with the tool's own message, never emits
/// `ToolCompleted`, and the turn still ends in `Finish`.
#[tokio::test]
async fn inline_markup_tool_failure_still_reaches_finish() {
    let response = CompletionResponse {
        content: Some(r#"Running it now. <execute_python_code code="raise_exception"/> done."#.to_string()),
        tool_calls: vec![],
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage::default(),
    };

    let processor = processor_with_py(ResponseProcessorConfig::default());
    let events = processor.process_response(&response, &test_ctx()).await;

    assert!(events.iter().any(|e| matches!(e, Event::ToolStarted { .. })));
    assert!(!events.iter().any(|e| matches!(e, Event::ToolCompleted { .. })));
    let failed = events.iter().find_map(|e| match e {
        Event::ToolFailed { error, .. } => Some(error.clone()),
        _ => None,
    });
    assert_eq!(failed.as_deref(), Some("boom: deliberate failure"));
    assert!(matches!(events.last().unwrap(), Event::Finish { .. }));
}

/// Scenario 5 - deleting a task cascades through its subtasks, removes it
/// from its parent's `subtasks` list, and notifies the parent's listener
/// exactly once with the updated list.
#[tokio::test]
async fn cascading_delete_removes_descendants_and_updates_parent_once() {
    let temp = tempfile::tempdir().unwrap();
    let state = StateManager::spawn(temp.path()).unwrap();

    let p = state.create_task(TaskCreate::new("P")).await.unwrap();
    let a = state.add_subtask(&p.id, TaskCreate::new("A")).await.unwrap();
    let b = state.add_subtask(&p.id, TaskCreate::new("B")).await.unwrap();
    let a1 = state.add_subtask(&a.id, TaskCreate::new("A1")).await.unwrap();

    let mut parent_listener = state.subscribe(&p.id).await.unwrap();

    state.delete_task(&a.id).await.unwrap();

    assert!(state.get_task(&a.id).await.unwrap().is_none());
    assert!(state.get_task(&a1.id).await.unwrap().is_none());

    let p_after = state.get_task(&p.id).await.unwrap().unwrap();
    assert_eq!(p_after.subtasks, vec![b.id]);

    let update = tokio::time::timeout(std::time::Duration::from_secs(1), parent_listener.recv())
        .await
        .expect("parent listener should hear about the delete")
        .expect("channel should stay open");
    assert_eq!(update.id, p.id);
    assert!(parent_listener.try_recv().is_err(), "listener should receive exactly one update");

    state.shutdown().await.unwrap();
}

/// A dependency that doesn't name a sibling of the new task's parent is
/// rejected rather than silently accepted, per the sibling-scoping
/// invariant the other scenarios all assume.
#[tokio::test]
async fn create_task_rejects_dependency_outside_sibling_scope() {
    let temp = tempfile::tempdir().unwrap();
    let state = StateManager::spawn(temp.path()).unwrap();

    let parent = state.create_task(TaskCreate::new("Parent")).await.unwrap();
    let outsider = state.create_task(TaskCreate::new("Outsider")).await.unwrap();

    let mut create = TaskCreate::new("Child").with_parent(parent.id.clone());
    create.dependencies = HashSet::from([outsider.id]);

    let result = state.add_subtask(&parent.id, create).await;
    assert!(result.is_err());

    state.shutdown().await.unwrap();
}

/// The `agentcore` binary's `task list`/`task get`/`task delete` commands
/// round-trip through a real CLI invocation against a scratch taskstore
/// directory - the binary, not just the library, is exercised here.
#[test]
fn cli_task_list_and_get_and_delete_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let storage_dir = temp.path().join("store");
    let config_path = temp.path().join("agentcore.yaml");
    std::fs::write(
        &config_path,
        format!("storage:\n  taskstore-dir: \"{}\"\n", storage_dir.display()),
    )
    .unwrap();

    Command::cargo_bin("agentcore")
        .unwrap()
        .env("ANTHROPIC_API_KEY", "test-key-not-used-by-task-commands")
        .args(["--config", config_path.to_str().unwrap(), "task", "list"])
        .assert()
        .success()
        .stdout("[]\n");

    Command::cargo_bin("agentcore")
        .unwrap()
        .env("ANTHROPIC_API_KEY", "test-key-not-used-by-task-commands")
        .args(["--config", config_path.to_str().unwrap(), "task", "get", "no-such-task"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not found"));

    Command::cargo_bin("agentcore")
        .unwrap()
        .env("ANTHROPIC_API_KEY", "test-key-not-used-by-task-commands")
        .args(["--config", config_path.to_str().unwrap(), "task", "delete", "no-such-task"])
        .assert()
        .failure();
}
