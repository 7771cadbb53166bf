//! Model backend implementations for localcoder.
//!
//! All providers implement the `localcoder_core::Provider` trait.

pub mod ollama;

pub use ollama::OllamaProvider;
