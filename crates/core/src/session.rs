//! Session context: the per-session state surfaced to the operator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Snapshot of the session knobs that shape each round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Backend model identifier
    pub model: String,

    /// Planning mode asks the model to reason before acting
    pub planning: bool,

    /// Records currently in the memory store
    pub memory_count: usize,

    /// Directory every relative tool path resolves against
    pub project_root: PathBuf,
}

impl SessionContext {
    pub fn new(model: impl Into<String>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            planning: false,
            memory_count: 0,
            project_root: project_root.into(),
        }
    }

    /// Flip planning mode, returning the new value.
    pub fn toggle_planning(&mut self) -> bool {
        self.planning = !self.planning;
        self.planning
    }

    pub fn mode_label(&self) -> &'static str {
        if self.planning { "planning" } else { "direct" }
    }
}
