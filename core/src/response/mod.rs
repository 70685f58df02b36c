//! Response Processor - turns one LLM turn into a stream of [`Event`]s,
//! dispatching native function calls and inline-markup tags along the way.
//!
//! # Architecture
//!
//! ```text
//! CompletionResponse / StreamChunk stream → ResponseProcessor → Vec<Event>
//! ```
//!
//! Two entry points mirror the two ways a turn can arrive: [`process_response`]
//! for a completed, non-streaming [`CompletionResponse`], and
//! [`process_stream`] for a live [`StreamChunk`] channel. Both end in the same
//! event vocabulary so callers downstream of either path - the HTTP layer,
//! tests - don't need to know which one ran.

mod markup;

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::{generate_id, Event, InvocationStatus};
use crate::llm::{CompletionResponse, StopReason, StreamChunk, ToolCall};
use crate::tools::{ToolContext, ToolExecutor};

pub use markup::InlineMarkupMatch;

/// How inline-markup tool results are folded back into the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InlineMarkupResultStrategy {
    /// Emit `ToolCompleted`/`ToolFailed` like a native call would (default).
    #[default]
    Emit,
    /// Execute the tool but don't surface its result as an event - useful
    /// when the caller only cares about side effects, not outcomes.
    Silent,
}

/// Governs how a turn's native and inline-markup tool calls are handled.
#[derive(Debug, Clone)]
pub struct ResponseProcessorConfig {
    /// Whether the model's native `tool_calls` are dispatched at all.
    pub native_tool_calling: bool,
    /// Whether `<tag>` invocations embedded in assistant text are scanned for.
    pub inline_markup_tool_calling: bool,
    /// Whether discovered tool calls are actually executed, or just surfaced
    /// as `ToolStarted` events for the caller to run itself.
    pub execute_tools: bool,
    /// Whether tool calls are executed as soon as they're complete while
    /// still streaming, rather than only once the full response has arrived.
    pub execute_on_stream: bool,
    pub inline_markup_result_strategy: InlineMarkupResultStrategy,
}

impl Default for ResponseProcessorConfig {
    fn default() -> Self {
        Self {
            native_tool_calling: true,
            inline_markup_tool_calling: true,
            execute_tools: true,
            execute_on_stream: true,
            inline_markup_result_strategy: InlineMarkupResultStrategy::default(),
        }
    }
}

pub struct ResponseProcessor {
    tools: std::sync::Arc<ToolExecutor>,
    config: ResponseProcessorConfig,
}

impl ResponseProcessor {
    pub fn new(tools: std::sync::Arc<ToolExecutor>, config: ResponseProcessorConfig) -> Self {
        Self { tools, config }
    }

    /// Process a completed, non-streaming response.
    pub async fn process_response(&self, response: &CompletionResponse, ctx: &ToolContext) -> Vec<Event> {
        let mut events = Vec::new();
        let is_final = response.stop_reason != StopReason::ToolUse;

        if let Some(text) = response.content.as_deref().filter(|t| !t.is_empty()) {
            events.push(Event::AssistantText { content: text.to_string(), is_final });

            if self.config.inline_markup_tool_calling {
                for matched in markup::scan(text, &self.tools.inline_markup_methods()) {
                    events.extend(self.dispatch_inline(matched, ctx).await);
                }
            }
        }

        if self.config.native_tool_calling {
            for call in &response.tool_calls {
                events.extend(self.dispatch_native(call, ctx).await);
            }
        }

        events.push(Event::Finish { reason: format!("{:?}", response.stop_reason) });
        events
    }

    /// Process a live stream of chunks, dispatching tool calls as their
    /// argument buffers close (`ToolUseEnd`) when `execute_on_stream` is set,
    /// or after the stream ends otherwise.
    pub async fn process_stream(&self, mut chunk_rx: mpsc::Receiver<StreamChunk>, ctx: &ToolContext) -> Vec<Event> {
        let mut events = Vec::new();
        let mut slots: HashMap<String, (String, String)> = HashMap::new();
        let mut pending: Vec<ToolCall> = Vec::new();

        while let Some(chunk) = chunk_rx.recv().await {
            match chunk {
                StreamChunk::MessageStart { .. } => {}
                StreamChunk::TextDelta(text) => {
                    events.push(Event::AssistantText { content: text, is_final: false });
                }
                StreamChunk::ToolUseStart { id, name } => {
                    slots.insert(id, (name, String::new()));
                }
                StreamChunk::ToolUseDelta { id, json_delta } => {
                    if let Some((_, buffer)) = slots.get_mut(&id) {
                        buffer.push_str(&json_delta);
                    }
                }
                StreamChunk::ToolUseEnd { id } => {
                    let Some((name, buffer)) = slots.remove(&id) else { continue };
                    let input = serde_json::from_str(&buffer).unwrap_or_else(|err| {
                        warn!(%id, %name, %err, "tool call arguments failed to parse as JSON, using an empty object");
                        Value::Object(Default::default())
                    });
                    let call = ToolCall { id, name, input };

                    if self.config.native_tool_calling && self.config.execute_tools && self.config.execute_on_stream {
                        events.extend(self.dispatch_native(&call, ctx).await);
                    } else {
                        pending.push(call);
                    }
                }
                StreamChunk::MessageDone { stop_reason, .. } => {
                    if self.config.native_tool_calling {
                        for call in pending.drain(..) {
                            events.extend(self.dispatch_native(&call, ctx).await);
                        }
                    }
                    events.push(Event::Finish { reason: format!("{stop_reason:?}") });
                }
                StreamChunk::Error(message) => {
                    events.push(Event::Finish { reason: format!("error: {message}") });
                }
            }
        }

        events
    }

    async fn dispatch_native(&self, call: &ToolCall, ctx: &ToolContext) -> Vec<Event> {
        let Some((tool_id, method_name)) = call.name.split_once("__") else {
            warn!(name = %call.name, "native tool call name is not a <toolId>__<methodName> identifier, skipping");
            return Vec::new();
        };

        let params: HashMap<String, Value> = match &call.input {
            Value::Object(map) => map.clone().into_iter().collect(),
            other => {
                let mut map = HashMap::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };

        self.dispatch(tool_id, method_name, params, ctx, InlineMarkupResultStrategy::Emit).await
    }

    async fn dispatch_inline(&self, matched: InlineMarkupMatch, ctx: &ToolContext) -> Vec<Event> {
        self.dispatch(&matched.tool_id, &matched.method_name, matched.params, ctx, self.config.inline_markup_result_strategy)
            .await
    }

    async fn dispatch(
        &self,
        tool_id: &str,
        method_name: &str,
        params: HashMap<String, Value>,
        ctx: &ToolContext,
        result_strategy: InlineMarkupResultStrategy,
    ) -> Vec<Event> {
        let invocation_id = generate_id("inv", &format!("{tool_id}-{method_name}"));
        let mut events = vec![Event::ToolStarted {
            invocation_id: invocation_id.clone(),
            tool_id: tool_id.to_string(),
            method_name: method_name.to_string(),
            params: params.clone(),
        }];

        if !self.config.execute_tools {
            return events;
        }

        let invocation = self.tools.execute_tool(invocation_id.clone(), tool_id, method_name, params, ctx).await;

        if result_strategy == InlineMarkupResultStrategy::Silent {
            return events;
        }

        match invocation.status {
            InvocationStatus::Completed => {
                events.push(Event::ToolCompleted { invocation_id, result: invocation.result.unwrap_or(Value::Null) });
            }
            _ => {
                events.push(Event::ToolFailed {
                    invocation_id,
                    error: invocation.error.unwrap_or_else(|| "tool invocation failed".to_string()),
                });
            }
        }

        events
    }
}
