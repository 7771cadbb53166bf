//! The human side of the loop.

use async_trait::async_trait;

use crate::stream_event::AgentEvent;

/// The operator's answer to an approval prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Deny,
}

/// The operator abandoned a prompt (for example with Ctrl-C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("interrupted")]
pub struct Interrupted;

/// Whoever drives the agent: confirms gated calls, answers questions,
/// and watches the turn unfold.
///
/// The terminal REPL is one implementation; tests script another.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Show a one-line synopsis of a gated call and wait for a decision.
    async fn confirm(&self, synopsis: &str) -> Result<Decision, Interrupted>;

    /// Put a free-form question to the operator.
    async fn ask(&self, question: &str) -> Result<String, Interrupted>;

    fn notify(&self, event: &AgentEvent);
}
