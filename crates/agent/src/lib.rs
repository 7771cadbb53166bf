//! The localcoder agent.
//!
//! A user turn runs as bounded rounds of **stream → dispatch → commit**:
//!
//! 1. **Stream** a model response; `<think>` reasoning is split off and
//!    never stored
//! 2. **Dispatch** each tool call in order, asking the operator first for
//!    side-effecting tools
//! 3. **Commit** the round to history, then loop with the tool results
//!
//! The turn ends when the model answers without tools, calls
//! `task_complete`, or runs out of rounds.

pub mod approval;
pub mod assembler;
pub mod capability;
pub mod commands;
pub mod loop_runner;
pub mod operator;
pub mod prompt;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use approval::{Approval, ApprovalGate};
pub use assembler::{AssemblerEvent, ReasoningScanner, StreamAssembler};
pub use capability::Capability;
pub use commands::{Command, CommandOutput, HELP, MemoryCommand};
pub use loop_runner::{AgentError, AgentLoop, TurnOutcome};
pub use operator::{Decision, Interrupted, Operator};
pub use prompt::build_system_prompt;
pub use stream_event::AgentEvent;
