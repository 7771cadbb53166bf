//! File read tool: line-numbered file contents.

use async_trait::async_trait;
use localcoder_core::error::ToolError;
use localcoder_core::tool::{Tool, ToolArguments, parse_arguments};
use serde::Deserialize;

use crate::path::{ProjectRoot, lenient_usize};

/// Whole-file reads stop after this many lines.
const MAX_LINES: usize = 500;

pub struct FileReadTool {
    root: ProjectRoot,
}

impl FileReadTool {
    pub fn new(root: ProjectRoot) -> Self {
        Self { root }
    }
}

#[derive(Debug, Deserialize)]
struct ReadArgs {
    path: String,
    #[serde(default, deserialize_with = "lenient_usize")]
    start: Option<usize>,
    #[serde(default, deserialize_with = "lenient_usize")]
    end: Option<usize>,
}

/// `N: line` for each line, keeping the original line endings.
fn number_lines<'a>(lines: impl Iterator<Item = (usize, &'a str)>) -> String {
    lines.map(|(n, line)| format!("{n}: {line}")).collect()
}

fn render(content: &str, start: Option<usize>, end: Option<usize>) -> String {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let total = lines.len();

    if start.is_some() || end.is_some() {
        let first = start.unwrap_or(1).max(1);
        let last = end.unwrap_or(total).min(total);
        if first > last {
            return String::new();
        }
        return number_lines((first..=last).map(|n| (n, lines[n - 1])));
    }

    if total > MAX_LINES {
        return format!(
            "File has {total} lines. Showing first {MAX_LINES}:\n{}",
            number_lines(lines.iter().take(MAX_LINES).enumerate().map(|(i, l)| (i + 1, *l)))
        );
    }
    number_lines(lines.iter().enumerate().map(|(i, l)| (i + 1, *l)))
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Returns line-numbered content."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to read"
                },
                "start": {
                    "type": "integer",
                    "description": "Starting line number (1-based, optional)"
                },
                "end": {
                    "type": "integer",
                    "description": "Ending line number (inclusive, optional)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<String, ToolError> {
        let args: ReadArgs = parse_arguments(self.name(), arguments)?;
        let path = self.root.resolve(&args.path);

        if !path.is_file() {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("File not found: {}", path.display()),
            });
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("Failed to read {}: {e}", path.display()),
            })?;
        let content = String::from_utf8_lossy(&bytes);

        Ok(render(&content, args.start, args.end))
    }
}
