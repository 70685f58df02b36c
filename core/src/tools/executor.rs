//! Tool Registry & Orchestrator
//!
//! Registers tools by stable `toolId`, exports both schema forms required by
//! the response processor (native function-call schemas and inline-markup
//! documentation), and dispatches invocations. Never propagates a tool's
//! error to the caller - every outcome, success or failure, is folded into a
//! [`ToolInvocation`].

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::{error, warn};

use crate::domain::ToolInvocation;

use super::builtin::{
    CompleteTaskTool, EditFileTool, FetchTool, GlobTool, GrepTool, ListDirectoryTool, ReadFileTool, RunCommandTool,
    SearchTool, TodoTool, TreeTool, WriteFileTool,
};
use super::context::ToolContext;
use super::traits::{Tool, ToolMethod};

/// A single exported function schema, named `<toolId>__<methodName>`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Error raised by [`ToolExecutor::register_tool`].
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("tool id '{0}' must not contain '__'")]
    ReservedSeparatorInToolId(String),

    #[error("method '{0}' on tool '{1}' must not contain '__'")]
    ReservedSeparatorInMethodName(String, String),
}

/// Registry and dispatcher for tools.
pub struct ToolExecutor {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Construct an executor pre-loaded with every builtin tool.
    pub fn standard() -> Self {
        let mut executor = Self::new();
        let builtins: Vec<Box<dyn Tool>> = vec![
            Box::new(ReadFileTool),
            Box::new(WriteFileTool),
            Box::new(EditFileTool),
            Box::new(GlobTool),
            Box::new(GrepTool),
            Box::new(ListDirectoryTool),
            Box::new(TreeTool),
            Box::new(RunCommandTool),
            Box::new(SearchTool::default()),
            Box::new(FetchTool),
            Box::new(TodoTool::default()),
            Box::new(CompleteTaskTool),
        ];
        for tool in builtins {
            executor.register_tool(tool).expect("builtin tools never collide");
        }
        executor
    }

    /// Register a tool. Fails if `toolId` is already registered, or if the
    /// tool id or any method name contains the reserved `__` separator.
    pub fn register_tool(&mut self, tool: Box<dyn Tool>) -> Result<(), RegistrationError> {
        let tool_id = tool.tool_id().to_string();

        if tool_id.contains("__") {
            return Err(RegistrationError::ReservedSeparatorInToolId(tool_id));
        }
        if self.tools.contains_key(&tool_id) {
            return Err(RegistrationError::DuplicateTool(tool_id));
        }
        for method in tool.methods() {
            if method.name.contains("__") {
                return Err(RegistrationError::ReservedSeparatorInMethodName(method.name, tool_id));
            }
        }

        self.tools.insert(tool_id, tool);
        Ok(())
    }

    /// Discover tools from a plugin directory. Dynamic loading of arbitrary
    /// plugin binaries is left to the host; this walks the directory and
    /// logs+skips any entry it cannot make sense of, per the "failures to
    /// load any single plugin are logged and skipped" contract.
    pub fn load_tools_from_directory(&mut self, path: Option<&Path>) -> usize {
        let Some(path) = path else { return 0 };
        let entries = match std::fs::read_dir(path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(?path, %err, "tool plugin directory unreadable, skipping");
                return 0;
            }
        };

        for entry in entries.flatten() {
            warn!(path = ?entry.path(), "tool plugin discovery found an entry but dynamic loading is not implemented; skipping");
        }
        0
    }

    /// Whether `tool_id` is registered.
    pub fn has_tool(&self, tool_id: &str) -> bool {
        self.tools.contains_key(tool_id)
    }

    /// Every registered tool id.
    pub fn tool_ids(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// One [`FunctionSchema`] per method across every registered tool, named
    /// `<toolId>__<methodName>`.
    pub fn get_tool_schemas_for_llm(&self) -> Vec<FunctionSchema> {
        let mut schemas = Vec::new();
        for (tool_id, tool) in &self.tools {
            for method in tool.methods() {
                schemas.push(FunctionSchema {
                    name: format!("{tool_id}__{}", method.name),
                    description: method.description.clone(),
                    parameters: method.input_schema.clone(),
                });
            }
        }
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Every registered `(toolId, methodName, schema)` that has an
    /// inline-markup mapping, for the response processor's tag scanner.
    pub fn inline_markup_methods(&self) -> Vec<(String, String, super::traits::InlineMarkupSchema)> {
        let mut methods = Vec::new();
        for (tool_id, tool) in &self.tools {
            for method in tool.methods() {
                if let Some(markup) = method.inline_markup {
                    methods.push((tool_id.clone(), method.name, markup));
                }
            }
        }
        methods.sort_by(|a, b| a.2.tag_name.cmp(&b.2.tag_name));
        methods
    }

    /// Human-readable documentation of every tag name and its parameter
    /// mapping, for injection into an LLM system prompt.
    pub fn get_inline_markup_schemas_for_llm(&self) -> String {
        let mut methods_with_markup: Vec<(String, ToolMethod)> = Vec::new();
        for (tool_id, tool) in &self.tools {
            for method in tool.methods() {
                if method.inline_markup.is_some() {
                    methods_with_markup.push((tool_id.clone(), method));
                }
            }
        }
        methods_with_markup.sort_by(|a, b| a.1.name.cmp(&b.1.name));

        let mut doc = String::new();
        for (tool_id, method) in methods_with_markup {
            let markup = method.inline_markup.expect("filtered above");
            doc.push_str(&format!("## <{}>\n", markup.tag_name));
            doc.push_str(&format!("Invokes {tool_id}__{}. Parameters:\n", method.name));
            for param in &markup.params {
                let source = match &param.source {
                    super::traits::ParamSource::Attribute => "attribute".to_string(),
                    super::traits::ParamSource::Element { path } => format!("element at '{path}'"),
                    super::traits::ParamSource::Content => "tag content".to_string(),
                };
                doc.push_str(&format!("- {}: {source}\n", param.name));
            }
            doc.push_str(&format!("Example: {}\n\n", markup.example));
        }
        doc
    }

    /// Look up the tool and method, then invoke it. Never returns an `Err` -
    /// unknown tool, unknown method, and any exception the method raises are
    /// all folded into a `failed` [`ToolInvocation`].
    pub async fn execute_tool(
        &self,
        invocation_id: String,
        tool_id: &str,
        method_name: &str,
        params: HashMap<String, Value>,
        ctx: &ToolContext,
    ) -> ToolInvocation {
        let invocation = ToolInvocation::started(invocation_id, tool_id.to_string(), method_name.to_string(), params.clone());

        let Some(tool) = self.tools.get(tool_id) else {
            return invocation.fail(format!("Tool with ID '{tool_id}' not found"));
        };

        if !tool.methods().iter().any(|m| m.name == method_name) {
            return invocation.fail(format!("Method '{method_name}' not found on tool '{tool_id}'"));
        }

        let input = Value::Object(params.into_iter().collect());
        let result = tool.call(method_name, input, ctx).await;

        if result.is_error {
            error!(tool_id, method_name, error = %result.content, "tool invocation failed");
            invocation.fail(result.content)
        } else {
            invocation.complete(Value::String(result.content))
        }
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn tool_id(&self) -> &'static str {
            "Echo"
        }

        fn methods(&self) -> Vec<ToolMethod> {
            vec![ToolMethod::new("say", "echoes input", json!({"type": "object"}))]
        }

        async fn call(&self, _method_name: &str, input: Value, _ctx: &ToolContext) -> super::super::traits::ToolResult {
            super::super::traits::ToolResult::success(input.to_string())
        }
    }

    fn test_ctx() -> ToolContext {
        ToolContext::new_unsandboxed(std::env::temp_dir(), "test-task".to_string())
    }

    #[test]
    fn rejects_tool_id_with_double_underscore() {
        struct BadTool;
        #[async_trait]
        impl Tool for BadTool {
            fn tool_id(&self) -> &'static str {
                "Bad__Tool"
            }
            fn methods(&self) -> Vec<ToolMethod> {
                vec![]
            }
            async fn call(&self, _m: &str, _i: Value, _c: &ToolContext) -> super::super::traits::ToolResult {
                super::super::traits::ToolResult::success("")
            }
        }

        let mut executor = ToolExecutor::new();
        let err = executor.register_tool(Box::new(BadTool)).unwrap_err();
        assert!(matches!(err, RegistrationError::ReservedSeparatorInToolId(_)));
    }

    #[test]
    fn rejects_duplicate_registration() {
        let mut executor = ToolExecutor::new();
        executor.register_tool(Box::new(EchoTool)).unwrap();
        let err = executor.register_tool(Box::new(EchoTool)).unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateTool(_)));
    }

    #[test]
    fn schema_names_are_composite_and_split_round_trips() {
        let mut executor = ToolExecutor::new();
        executor.register_tool(Box::new(EchoTool)).unwrap();

        let schemas = executor.get_tool_schemas_for_llm();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "Echo__say");

        let (tool_id, method_name) = schemas[0].name.split_once("__").unwrap();
        assert_eq!(tool_id, "Echo");
        assert_eq!(method_name, "say");
    }

    #[tokio::test]
    async fn unknown_tool_yields_failed_invocation_not_error() {
        let executor = ToolExecutor::new();
        let invocation = executor
            .execute_tool("inv-1".to_string(), "Nope", "say", HashMap::new(), &test_ctx())
            .await;

        assert_eq!(invocation.status, crate::domain::InvocationStatus::Failed);
        assert_eq!(invocation.error.as_deref(), Some("Tool with ID 'Nope' not found"));
    }

    #[tokio::test]
    async fn unknown_method_yields_failed_invocation() {
        let mut executor = ToolExecutor::new();
        executor.register_tool(Box::new(EchoTool)).unwrap();

        let invocation = executor
            .execute_tool("inv-2".to_string(), "Echo", "shout", HashMap::new(), &test_ctx())
            .await;

        assert_eq!(invocation.status, crate::domain::InvocationStatus::Failed);
        assert_eq!(invocation.error.as_deref(), Some("Method 'shout' not found on tool 'Echo'"));
    }

    #[tokio::test]
    async fn known_tool_and_method_dispatches_and_completes() {
        let mut executor = ToolExecutor::new();
        executor.register_tool(Box::new(EchoTool)).unwrap();

        let mut params = HashMap::new();
        params.insert("text".to_string(), json!("hi"));

        let invocation = executor.execute_tool("inv-3".to_string(), "Echo", "say", params, &test_ctx()).await;
        assert_eq!(invocation.status, crate::domain::InvocationStatus::Completed);
    }
}
