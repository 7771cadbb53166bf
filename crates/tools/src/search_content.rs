//! Content search tool: case-insensitive regex over project files.

use async_trait::async_trait;
use localcoder_core::error::ToolError;
use localcoder_core::tool::{Tool, ToolArguments, parse_arguments};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::path::{ProjectRoot, is_ignored};

const MAX_MATCHES: usize = 50;

pub struct SearchContentTool {
    root: ProjectRoot,
}

impl SearchContentTool {
    pub fn new(root: ProjectRoot) -> Self {
        Self { root }
    }
}

#[derive(Debug, Deserialize)]
struct SearchContentArgs {
    regex: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    file_glob: Option<String>,
}

fn invalid(reason: String) -> ToolError {
    ToolError::InvalidArguments {
        tool_name: "search_content".into(),
        reason,
    }
}

/// Candidate files under `base`, in a stable order.
fn candidates(base: &Path, file_glob: Option<&str>) -> Result<Vec<PathBuf>, ToolError> {
    let mut files: Vec<PathBuf> = match file_glob.map(str::trim).filter(|g| !g.is_empty()) {
        Some(pattern) => glob::glob(&base.join(pattern).to_string_lossy())
            .map_err(|e| invalid(format!("Invalid file_glob: {e}")))?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect(),
        None => WalkDir::new(base)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_ignored(base, e.path()))
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect(),
    };
    files.retain(|p| !is_ignored(base, p));
    files.sort();
    Ok(files)
}

fn search(
    root: &ProjectRoot,
    base: &Path,
    pattern: &Regex,
    file_glob: Option<&str>,
) -> Result<String, ToolError> {
    let mut results = Vec::new();
    for file in candidates(base, file_glob)? {
        let Ok(bytes) = std::fs::read(&file) else {
            continue;
        };
        let content = String::from_utf8_lossy(&bytes);
        let shown = root.display(&file);
        for (n, line) in content.lines().enumerate() {
            if pattern.is_match(line) {
                results.push(format!("{shown}:{}: {}", n + 1, line.trim_end()));
                if results.len() >= MAX_MATCHES {
                    results.push(format!("... (results truncated at {MAX_MATCHES} matches)"));
                    return Ok(results.join("\n"));
                }
            }
        }
    }

    if results.is_empty() {
        return Ok("No matches found.".into());
    }
    Ok(results.join("\n"))
}

#[async_trait]
impl Tool for SearchContentTool {
    fn name(&self) -> &str {
        "search_content"
    }

    fn description(&self) -> &str {
        "Search file contents using a regex pattern. Returns matching lines with file paths and line numbers."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "regex": {
                    "type": "string",
                    "description": "Regular expression to search for"
                },
                "path": {
                    "type": "string",
                    "description": "Base directory to search in (default: project root)"
                },
                "file_glob": {
                    "type": "string",
                    "description": "Glob pattern to filter files (e.g. '**/*.rs')"
                }
            },
            "required": ["regex"]
        })
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<String, ToolError> {
        let args: SearchContentArgs = parse_arguments(self.name(), arguments)?;
        let pattern = RegexBuilder::new(&args.regex)
            .case_insensitive(true)
            .build()
            .map_err(|e| invalid(format!("Invalid regex: {e}")))?;

        let root = self.root.clone();
        let base = root.resolve_base(args.path.as_deref());

        tokio::task::spawn_blocking(move || search(&root, &base, &pattern, args.file_glob.as_deref()))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "search_content".into(),
                reason: e.to_string(),
            })?
    }
}
