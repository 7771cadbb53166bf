//! File search tool: glob matching under a base directory.

use async_trait::async_trait;
use localcoder_core::error::ToolError;
use localcoder_core::tool::{Tool, ToolArguments, parse_arguments};
use serde::Deserialize;
use std::path::Path;

use crate::path::{ProjectRoot, is_ignored};

const MAX_RESULTS: usize = 100;

pub struct SearchFilesTool {
    root: ProjectRoot,
}

impl SearchFilesTool {
    pub fn new(root: ProjectRoot) -> Self {
        Self { root }
    }
}

#[derive(Debug, Deserialize)]
struct SearchFilesArgs {
    pattern: String,
    #[serde(default)]
    path: Option<String>,
}

fn find(root: &ProjectRoot, base: &Path, pattern: &str) -> Result<String, ToolError> {
    let full = base.join(pattern);
    let entries = glob::glob(&full.to_string_lossy()).map_err(|e| ToolError::InvalidArguments {
        tool_name: "search_files".into(),
        reason: format!("Invalid glob pattern: {e}"),
    })?;

    let mut matches: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|p| !is_ignored(base, p))
        .map(|p| root.display(&p))
        .collect();
    matches.sort();

    if matches.is_empty() {
        return Ok("No files found.".into());
    }
    if matches.len() > MAX_RESULTS {
        let extra = matches.len() - MAX_RESULTS;
        matches.truncate(MAX_RESULTS);
        return Ok(format!("{}\n... and {extra} more", matches.join("\n")));
    }
    Ok(matches.join("\n"))
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search for files matching a glob pattern (e.g. '**/*.rs', '**/test_*')."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern to match files"
                },
                "path": {
                    "type": "string",
                    "description": "Base directory to search in (default: project root)"
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<String, ToolError> {
        let args: SearchFilesArgs = parse_arguments(self.name(), arguments)?;
        let root = self.root.clone();
        let base = root.resolve_base(args.path.as_deref());

        tokio::task::spawn_blocking(move || find(&root, &base, &args.pattern))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "search_files".into(),
                reason: e.to_string(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> ToolArguments {
        value.as_object().cloned().unwrap()
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in [
            "src/main.rs",
            "src/lib.rs",
            "src/util/mod.rs",
            ".git/config.rs",
            "node_modules/dep/index.rs",
            "README.md",
        ] {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn finds_sorted_matches_skipping_ignored_dirs() {
        let dir = project();
        let tool = SearchFilesTool::new(ProjectRoot::new(dir.path()));
        let out = tool.execute(&args(json!({"pattern": "**/*.rs"}))).await.unwrap();
        assert_eq!(out, "src/lib.rs\nsrc/main.rs\nsrc/util/mod.rs");
    }

    #[tokio::test]
    async fn base_path_narrows_search() {
        let dir = project();
        let tool = SearchFilesTool::new(ProjectRoot::new(dir.path()));
        let out = tool
            .execute(&args(json!({"pattern": "*.rs", "path": "src/util"})))
            .await
            .unwrap();
        assert_eq!(out, "src/util/mod.rs");
    }

    #[tokio::test]
    async fn no_matches() {
        let dir = project();
        let tool = SearchFilesTool::new(ProjectRoot::new(dir.path()));
        let out = tool.execute(&args(json!({"pattern": "**/*.py"}))).await.unwrap();
        assert_eq!(out, "No files found.");
    }

    #[tokio::test]
    async fn results_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..105 {
            std::fs::write(dir.path().join(format!("f{i:03}.txt")), "").unwrap();
        }
        let tool = SearchFilesTool::new(ProjectRoot::new(dir.path()));
        let out = tool.execute(&args(json!({"pattern": "*.txt"}))).await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 101);
        assert_eq!(lines[0], "f000.txt");
        assert_eq!(lines[100], "... and 5 more");
    }

    #[tokio::test]
    async fn invalid_pattern_is_rejected() {
        let dir = project();
        let tool = SearchFilesTool::new(ProjectRoot::new(dir.path()));
        let err = tool.execute(&args(json!({"pattern": "***"}))).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
