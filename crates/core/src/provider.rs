//! Provider trait: the abstraction over the model backend.
//!
//! A Provider streams one model response as a sequence of `StreamFrame`s.
//! The agent never sees the wire format; the frame contract below is all it
//! consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::ToolCall;

/// One chat request to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g., "qwen3:8b")
    pub model: String,

    /// System message followed by the session history
    pub messages: Vec<Message>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A single frame of a streaming response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamFrame {
    /// Incremental text fragment
    #[serde(default)]
    pub content: Option<String>,

    /// Fully-formed tool calls carried by this frame
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Whether this is the final frame
    #[serde(default)]
    pub done: bool,
}

impl StreamFrame {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn tool_call(call: ToolCall) -> Self {
        Self {
            tool_calls: vec![call],
            ..Self::default()
        }
    }

    pub fn done() -> Self {
        Self {
            done: true,
            ..Self::default()
        }
    }
}

/// Receiving half of a response stream.
pub type FrameReceiver = tokio::sync::mpsc::Receiver<Result<StreamFrame, ProviderError>>;

/// The core Provider trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a stream of response frames.
    ///
    /// An `Err` item on the receiver ends the stream; a closed receiver
    /// without a `done` frame is a clean end.
    async fn stream(&self, request: ChatRequest) -> Result<FrameReceiver, ProviderError>;

    /// List models available on the backend.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Whether the backend is reachable.
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_constructors() {
        assert_eq!(StreamFrame::text("hi").content.as_deref(), Some("hi"));
        assert!(StreamFrame::done().done);
        let frame = StreamFrame::tool_call(ToolCall::new("recall", Default::default()));
        assert_eq!(frame.tool_calls.len(), 1);
        assert!(!frame.done);
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "run_command".into(),
            description: "Execute a shell command".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "The command to run" }
                },
                "required": ["command"]
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("run_command"));
        assert!(json.contains("command"));
    }
}
