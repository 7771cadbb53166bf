//! Approval gate for side-effecting tools.

use localcoder_core::tool::ToolCall;
use serde_json::Value;
use std::collections::BTreeSet;

/// Longest argument preview shown in a synopsis, in characters.
const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    AutoExecute,
    NeedsApproval,
}

/// Decides which tool calls need the operator's consent before they run.
#[derive(Debug, Clone)]
pub struct ApprovalGate {
    gated: BTreeSet<String>,
}

impl Default for ApprovalGate {
    fn default() -> Self {
        Self::new(["run_command", "write_file", "edit_file"])
    }
}

impl ApprovalGate {
    pub fn new<I, S>(gated: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            gated: gated.into_iter().map(Into::into).collect(),
        }
    }

    pub fn classify(&self, tool_name: &str) -> Approval {
        if self.gated.contains(tool_name) {
            Approval::NeedsApproval
        } else {
            Approval::AutoExecute
        }
    }

    /// One-line rendering of a call for the approval prompt:
    /// `name(key='value', ...)` in the order the model sent the arguments,
    /// with each value preview capped.
    pub fn synopsis(call: &ToolCall) -> String {
        let args: Vec<String> = call
            .arguments
            .iter()
            .map(|(key, value)| format!("{key}={}", preview(value)))
            .collect();
        format!("{}({})", call.name, args.join(", "))
    }
}

fn preview(value: &Value) -> String {
    let rendered = match value {
        Value::String(s) => quote(s),
        other => other.to_string(),
    };
    rendered.chars().take(PREVIEW_CHARS).collect()
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
