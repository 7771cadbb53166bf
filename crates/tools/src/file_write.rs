//! File write tool: create or overwrite a file.

use async_trait::async_trait;
use localcoder_core::error::ToolError;
use localcoder_core::tool::{Tool, ToolArguments, parse_arguments};
use serde::Deserialize;
use tracing::debug;

use crate::path::ProjectRoot;

pub struct FileWriteTool {
    root: ProjectRoot,
}

impl FileWriteTool {
    pub fn new(root: ProjectRoot) -> Self {
        Self { root }
    }
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

fn line_count(content: &str) -> usize {
    content.lines().count()
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a file with the given content."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "The full content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<String, ToolError> {
        let args: WriteArgs = parse_arguments(self.name(), arguments)?;
        let path = self.root.resolve(&args.path);
        let fail = |reason: String| ToolError::ExecutionFailed {
            tool_name: "write_file".into(),
            reason,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| fail(format!("Failed to create directories: {e}")))?;
        }

        tokio::fs::write(&path, &args.content)
            .await
            .map_err(|e| fail(format!("Failed to write {}: {e}", path.display())))?;

        let lines = line_count(&args.content);
        debug!(path = %path.display(), lines, "File written");
        Ok(format!("Wrote {lines} lines to {}", self.root.display(&path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn counts_lines() {
        assert_eq!(line_count(""), 0);
        assert_eq!(line_count("a"), 1);
        assert_eq!(line_count("a\nb\n"), 2);
        assert_eq!(line_count("a\nb"), 2);
    }

    #[tokio::test]
    async fn write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriteTool::new(ProjectRoot::new(dir.path()));
        let out = tool
            .execute(&args(json!({"path": "src/nested/new.rs", "content": "fn main() {}\n"})))
            .await
            .unwrap();

        assert_eq!(out, "Wrote 1 lines to src/nested/new.rs");
        let written = std::fs::read_to_string(dir.path().join("src/nested/new.rs")).unwrap();
        assert_eq!(written, "fn main() {}\n");
    }

    #[tokio::test]
    async fn write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "old").unwrap();
        let tool = FileWriteTool::new(ProjectRoot::new(dir.path()));
        tool.execute(&args(json!({"path": "a.txt", "content": "new"})))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "new");
    }

    #[tokio::test]
    async fn missing_content_is_rejected() {
        let tool = FileWriteTool::new(ProjectRoot::new("."));
        let err = tool
            .execute(&args(json!({"path": "x.txt"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
