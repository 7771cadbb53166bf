//! Project memory for localcoder.
//!
//! A JSONL-backed record store with overlapping-window chunking of long
//! content and TF-IDF keyword relevance search.

pub mod chunk;
pub mod store;
pub mod tfidf;

pub use chunk::{CHUNK_OVERLAP, CHUNK_WORDS, chunk_words};
pub use store::MemoryStore;
pub use tfidf::{rank, tokenize};
