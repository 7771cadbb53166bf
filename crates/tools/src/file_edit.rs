//! File edit tool: exact, single-occurrence text replacement.

use async_trait::async_trait;
use localcoder_core::error::ToolError;
use localcoder_core::tool::{Tool, ToolArguments, parse_arguments};
use serde::Deserialize;
use tracing::debug;

use crate::path::ProjectRoot;

pub struct FileEditTool {
    root: ProjectRoot,
}

impl FileEditTool {
    pub fn new(root: ProjectRoot) -> Self {
        Self { root }
    }
}

#[derive(Debug, Deserialize)]
struct EditArgs {
    path: String,
    old_text: String,
    new_text: String,
}

#[async_trait]
impl Tool for FileEditTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Find and replace text in a file. The old_text must match exactly and occur once."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to edit"
                },
                "old_text": {
                    "type": "string",
                    "description": "The exact text to find and replace"
                },
                "new_text": {
                    "type": "string",
                    "description": "The replacement text"
                }
            },
            "required": ["path", "old_text", "new_text"]
        })
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<String, ToolError> {
        let args: EditArgs = parse_arguments(self.name(), arguments)?;
        if args.old_text.is_empty() {
            return Err(ToolError::InvalidArguments {
                tool_name: self.name().into(),
                reason: "old_text must not be empty".into(),
            });
        }

        let path = self.root.resolve(&args.path);
        let fail = |reason: String| ToolError::ExecutionFailed {
            tool_name: "edit_file".into(),
            reason,
        };

        if !path.is_file() {
            return Err(fail(format!("File not found: {}", path.display())));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| fail(format!("Failed to read {}: {e}", path.display())))?;

        match content.matches(args.old_text.as_str()).count() {
            0 => return Err(fail("old_text not found in file".into())),
            1 => {}
            n => {
                return Err(fail(format!(
                    "old_text found {n} times; include more context so it matches exactly once"
                )));
            }
        }

        let updated = content.replacen(&args.old_text, &args.new_text, 1);
        tokio::fs::write(&path, updated)
            .await
            .map_err(|e| fail(format!("Failed to write {}: {e}", path.display())))?;

        debug!(path = %path.display(), "File edited");
        Ok(format!("Edited {}: replaced 1 occurrence.", self.root.display(&path)))
    }
}
