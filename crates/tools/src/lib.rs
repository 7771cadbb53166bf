//! Built-in tool implementations for localcoder.
//!
//! Tools give the agent the ability to work on a project: read, write and
//! edit files, run shell commands, and search the tree by name or content.
//! Every relative path is resolved against the project root.

pub mod file_edit;
pub mod file_read;
pub mod file_write;
pub mod path;
pub mod search_content;
pub mod search_files;
pub mod shell;

use localcoder_config::ToolsConfig;
use localcoder_core::tool::ToolRegistry;
use std::path::PathBuf;
use std::time::Duration;

pub use path::ProjectRoot;

/// Create the registry of built-in project tools.
pub fn default_registry(project_root: impl Into<PathBuf>, config: &ToolsConfig) -> ToolRegistry {
    let root = ProjectRoot::new(project_root);
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(file_read::FileReadTool::new(root.clone())));
    registry.register(Box::new(file_write::FileWriteTool::new(root.clone())));
    registry.register(Box::new(file_edit::FileEditTool::new(root.clone())));
    registry.register(Box::new(
        shell::ShellTool::new(root.clone())
            .with_timeout(Duration::from_secs(config.command_timeout_secs))
            .with_max_output(config.max_output_chars),
    ));
    registry.register(Box::new(search_files::SearchFilesTool::new(root.clone())));
    registry.register(Box::new(search_content::SearchContentTool::new(root)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_tools() {
        let registry = default_registry("/tmp", &ToolsConfig::default());
        assert_eq!(
            registry.names(),
            vec![
                "edit_file",
                "read_file",
                "run_command",
                "search_content",
                "search_files",
                "write_file"
            ]
        );
        for def in registry.definitions() {
            assert_eq!(def.parameters["type"], "object");
            assert!(!def.description.is_empty());
        }
    }
}
