//! # localcoder core
//!
//! Domain types, traits, and error definitions for the localcoder agent.
//! Every collaborator the agent loop talks to (the model backend, the tool
//! capabilities, the memory record format, the session state) is described
//! here; implementations live in their own crates.

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{MemoryError, ProviderError, ToolError};
pub use memory::{MemoryKind, MemoryRecord};
pub use message::{History, Message, Role};
pub use provider::{ChatRequest, FrameReceiver, Provider, StreamFrame, ToolDefinition};
pub use session::SessionContext;
pub use tool::{Tool, ToolArguments, ToolCall, ToolRegistry, ToolResult, parse_arguments};
