//! Tool trait definition
//!
//! A tool is a stable `toolId` plus one or more methods. Each method carries
//! an OpenAPI-shaped function schema (for LLM function-calling) and,
//! optionally, an inline-markup schema (for tagged invocations embedded in
//! assistant text). See [`crate::tools::executor::ToolExecutor`] for how the
//! two schema forms are combined and dispatched.

use async_trait::async_trait;
use serde_json::Value;

use super::context::ToolContext;

/// Where an inline-markup parameter's value comes from within its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    /// An attribute on the tag itself, e.g. `<tag name="x">`.
    Attribute,
    /// The text content of a nested element at a relative path, e.g. `<tag><path>x</path></tag>`.
    Element { path: String },
    /// The entire inner text of the tag.
    Content,
}

/// One parameter mapping within an [`InlineMarkupSchema`].
#[derive(Debug, Clone)]
pub struct InlineParam {
    pub name: String,
    pub source: ParamSource,
}

impl InlineParam {
    pub fn attribute(name: impl Into<String>) -> Self {
        Self { name: name.into(), source: ParamSource::Attribute }
    }

    pub fn element(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self { name: name.into(), source: ParamSource::Element { path: path.into() } }
    }

    pub fn content(name: impl Into<String>) -> Self {
        Self { name: name.into(), source: ParamSource::Content }
    }
}

/// Describes a tag name and how to extract a method's parameters from it.
#[derive(Debug, Clone)]
pub struct InlineMarkupSchema {
    pub tag_name: String,
    pub params: Vec<InlineParam>,
    pub example: String,
}

/// One callable method on a [`Tool`]: a name, description, JSON-object
/// parameter schema, and an optional inline-markup mapping.
#[derive(Debug, Clone)]
pub struct ToolMethod {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub inline_markup: Option<InlineMarkupSchema>,
}

impl ToolMethod {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            inline_markup: None,
        }
    }

    pub fn with_inline_markup(mut self, schema: InlineMarkupSchema) -> Self {
        self.inline_markup = Some(schema);
        self
    }
}

/// A registered capability exposing one or more methods. `toolId` and every
/// method name must not contain `__` - that separator is reserved for the
/// composite `<toolId>__<methodName>` name the orchestrator hands to the LLM.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable tool identifier.
    fn tool_id(&self) -> &'static str;

    /// The methods this tool exposes.
    fn methods(&self) -> Vec<ToolMethod>;

    /// Invoke `method_name` with `input`. Implementations may assume
    /// `method_name` is one returned by [`Tool::methods`]; the orchestrator
    /// checks membership before calling.
    async fn call(&self, method_name: &str, input: Value, ctx: &ToolContext) -> ToolResult;
}

/// Result of a tool method invocation.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}
