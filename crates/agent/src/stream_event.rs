//! Events the agent reports to its operator while a turn runs.

use serde::{Deserialize, Serialize};

/// Events emitted by the agent during a turn.
///
/// - `chunk`       persisted reply text, in arrival order
/// - `thought`     reasoning text, transient
/// - `tool_call`   a call is about to be handled
/// - `tool_result` the call's outcome
/// - `denied`      the operator refused a gated call
/// - `info`        status line for the operator
/// - `done`        the turn is over
/// - `error`       the turn failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Chunk {
        content: String,
    },

    Thought {
        content: String,
    },

    ToolCall {
        name: String,
        input: serde_json::Value,
    },

    ToolResult {
        name: String,
        output: String,
        success: bool,
    },

    Denied {
        name: String,
    },

    Info {
        message: String,
    },

    Done {
        rounds: usize,
        tool_calls_made: usize,
    },

    Error {
        message: String,
    },
}

impl AgentEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Thought { .. } => "thought",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Denied { .. } => "denied",
            Self::Info { .. } => "info",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub(crate) fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }
}
