//! Shell tool: run a command in the project root.
//!
//! The child is killed if it outlives the timeout. Output is stdout, then
//! stderr, then the exit code; very long output keeps its head and tail.

use async_trait::async_trait;
use localcoder_core::error::ToolError;
use localcoder_core::tool::{Tool, ToolArguments, parse_arguments};
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::path::ProjectRoot;

const HEAD_CHARS: usize = 5000;
const TAIL_CHARS: usize = 2000;

pub struct ShellTool {
    root: ProjectRoot,
    timeout: Duration,
    max_output_chars: usize,
}

impl ShellTool {
    pub fn new(root: ProjectRoot) -> Self {
        Self {
            root,
            timeout: Duration::from_secs(60),
            max_output_chars: 10_000,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output(mut self, max_output_chars: usize) -> Self {
        self.max_output_chars = max_output_chars;
        self
    }
}

#[derive(Debug, Deserialize)]
struct CommandArgs {
    command: String,
}

fn format_output(stdout: &str, stderr: &str, exit_code: i32) -> String {
    let mut output = String::from(stdout);
    if !stderr.is_empty() {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(stderr);
    }
    if output.is_empty() {
        output.push_str("(no output)");
    }
    output.push_str(&format!("\n[exit code: {exit_code}]"));
    output
}

/// Keep the first and last stretch of output once it exceeds `limit` chars.
fn truncate_output(output: String, limit: usize) -> String {
    let total = output.chars().count();
    if total <= limit {
        return output;
    }
    let head: String = output.chars().take(HEAD_CHARS).collect();
    let tail: String = output.chars().skip(total.saturating_sub(TAIL_CHARS)).collect();
    format!("{head}\n... (truncated) ...\n{tail}")
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output. Use for running tests, installing packages, git operations, etc."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<String, ToolError> {
        let args: CommandArgs = parse_arguments(self.name(), arguments)?;
        let command = args.command.trim();
        if command.is_empty() {
            return Err(ToolError::InvalidArguments {
                tool_name: self.name().into(),
                reason: "command must not be empty".into(),
            });
        }

        debug!(command = %command, cwd = %self.root.path().display(), "Executing shell command");

        let child = Command::new("sh")
            .args(["-c", command])
            .current_dir(self.root.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolError::ExecutionFailed {
                    tool_name: self.name().into(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                // Dropping the output future kills the child.
                warn!(command = %command, timeout_secs = self.timeout.as_secs(), "Command timed out");
                return Err(ToolError::Timeout {
                    tool_name: self.name().into(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output.status.code().unwrap_or(-1);
        if code != 0 {
            debug!(command = %command, exit_code = code, "Command exited non-zero");
        }

        Ok(truncate_output(
            format_output(&stdout, &stderr, code),
            self.max_output_chars,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    fn tool_in(dir: &std::path::Path) -> ShellTool {
        ShellTool::new(ProjectRoot::new(dir))
    }

    #[test]
    fn output_layout() {
        assert_eq!(format_output("out\n", "", 0), "out\n\n[exit code: 0]");
        assert_eq!(format_output("out", "err", 1), "out\nerr\n[exit code: 1]");
        assert_eq!(format_output("", "", 0), "(no output)\n[exit code: 0]");
    }

    #[test]
    fn long_output_keeps_head_and_tail() {
        let long = format!("{}{}", "a".repeat(8000), "z".repeat(4000));
        let out = truncate_output(long, 10_000);
        assert!(out.starts_with(&"a".repeat(5000)));
        assert!(out.contains("\n... (truncated) ...\n"));
        assert!(out.ends_with(&"z".repeat(2000)));
        assert_eq!(out.chars().count(), 5000 + 2000 + "\n... (truncated) ...\n".len());

        let short = "fine".to_string();
        assert_eq!(truncate_output(short.clone(), 10_000), short);
    }

    #[tokio::test]
    async fn execute_echo_in_project_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();

        let out = tool_in(dir.path())
            .execute(&args(json!({"command": "echo hello && ls"})))
            .await
            .unwrap();
        assert!(out.contains("hello"));
        assert!(out.contains("marker.txt"));
        assert!(out.ends_with("[exit code: 0]"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let out = tool_in(dir.path())
            .execute(&args(json!({"command": "echo oops >&2; exit 3"})))
            .await
            .unwrap();
        assert_eq!(out, "oops\n\n[exit code: 3]");
    }

    #[tokio::test]
    async fn timeout_kills_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool_in(dir.path()).with_timeout(Duration::from_millis(200));
        let err = tool
            .execute(&args(json!({"command": "sleep 5"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[tokio::test]
    async fn empty_command_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let err = tool_in(dir.path())
            .execute(&args(json!({"command": "  "})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
