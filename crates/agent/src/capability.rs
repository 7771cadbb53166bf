//! Capabilities the agent handles itself rather than through the tool
//! registry: memory access, operator questions, and task completion.

use localcoder_core::error::ToolError;
use localcoder_core::provider::ToolDefinition;
use localcoder_core::tool::{ToolCall, parse_arguments};
use serde::Deserialize;
use serde_json::json;

pub const REMEMBER: &str = "remember";
pub const RECALL: &str = "recall";
pub const ASK_USER: &str = "ask_user";
pub const TASK_COMPLETE: &str = "task_complete";

#[derive(Debug, Clone, Deserialize)]
pub struct RememberArgs {
    pub content: String,
    #[serde(default)]
    tags: Option<Tags>,
}

impl RememberArgs {
    pub fn tags(&self) -> Vec<String> {
        match &self.tags {
            None => Vec::new(),
            Some(Tags::Joined(s)) => split_tags(s.split(',')),
            Some(Tags::List(items)) => split_tags(items.iter().map(String::as_str)),
        }
    }
}

/// Models send tags either as `"a, b"` or as `["a", "b"]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Tags {
    Joined(String),
    List(Vec<String>),
}

fn split_tags<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<String> {
    parts
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecallArgs {
    pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AskUserArgs {
    pub question: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskCompleteArgs {
    pub summary: String,
}

/// What a tool call resolves to.
#[derive(Debug, Clone)]
pub enum Capability {
    Remember(RememberArgs),
    Recall(RecallArgs),
    AskUser(AskUserArgs),
    TaskComplete(TaskCompleteArgs),
    /// Anything else goes to the tool registry.
    External,
}

impl Capability {
    /// Resolve a call by name, decoding the arguments of agent-handled
    /// capabilities up front.
    pub fn resolve(call: &ToolCall) -> Result<Self, ToolError> {
        let args = &call.arguments;
        Ok(match call.name.as_str() {
            REMEMBER => Self::Remember(parse_arguments(REMEMBER, args)?),
            RECALL => Self::Recall(parse_arguments(RECALL, args)?),
            ASK_USER => Self::AskUser(parse_arguments(ASK_USER, args)?),
            TASK_COMPLETE => Self::TaskComplete(parse_arguments(TASK_COMPLETE, args)?),
            _ => Self::External,
        })
    }

    /// Definitions advertised to the model for the agent-handled capabilities.
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: REMEMBER.into(),
                description: "Save information to persistent project memory: conventions, decisions, or anything worth keeping across sessions.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "content": {
                            "type": "string",
                            "description": "The information to remember"
                        },
                        "tags": {
                            "type": "string",
                            "description": "Comma-separated tags (e.g. 'build,convention')"
                        }
                    },
                    "required": ["content"]
                }),
            },
            ToolDefinition {
                name: RECALL.into(),
                description: "Search project memory for relevant information.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "What to look for"
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: ASK_USER.into(),
                description: "Ask the user a clarifying question and wait for the answer.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "question": {
                            "type": "string",
                            "description": "The question to ask"
                        }
                    },
                    "required": ["question"]
                }),
            },
            ToolDefinition {
                name: TASK_COMPLETE.into(),
                description: "Finish the current task with a summary of what was done.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "summary": {
                            "type": "string",
                            "description": "Summary of what was accomplished"
                        }
                    },
                    "required": ["summary"]
                }),
            },
        ]
    }
}
