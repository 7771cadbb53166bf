//! JSONL-backed memory store.
//!
//! Each line of the file is one JSON-encoded `MemoryRecord`. Records are
//! loaded into memory on open; every mutation rewrites the whole file through
//! a temporary sibling that is renamed into place, so the file on disk is
//! always a complete snapshot.
//!
//! Storage location: `<project>/.coder/memories.jsonl`

use localcoder_core::error::MemoryError;
use localcoder_core::memory::{MemoryKind, MemoryRecord};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chunk::chunk_words;
use crate::tfidf::rank;

const ID_LEN: usize = 12;

/// Durable project memory with keyword search.
pub struct MemoryStore {
    path: PathBuf,
    records: RwLock<Vec<MemoryRecord>>,
}

impl MemoryStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts an empty store (the file is created on the first
    /// write). Lines that do not parse are skipped with a warning.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = records.len(), "Memory store loaded");
        Self {
            path,
            records: RwLock::new(records),
        }
    }

    /// Open the store at `<root>/.coder/memories.jsonl`.
    pub fn for_project(root: &Path) -> Self {
        Self::open(root.join(".coder").join("memories.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Vec<MemoryRecord> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str::<MemoryRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(line = n + 1, error = %e, "Skipping corrupted memory record");
                    None
                }
            })
            .collect()
    }

    /// Write a full snapshot of `records`, replacing the file atomically.
    fn persist(&self, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| MemoryError::Serialization(e.to_string()))?;
            content.push_str(&line);
            content.push('\n');
        }

        let tmp = self.temp_path();
        std::fs::write(&tmp, &content)
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory snapshot: {e}")))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            MemoryError::Storage(format!("Failed to replace memory file: {e}"))
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "memories.jsonl".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Store `content`, splitting it into overlapping windows when it is
    /// longer than 500 words. Returns the created records in order.
    pub async fn insert(
        &self,
        content: &str,
        tags: Vec<String>,
        kind: MemoryKind,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut records = self.records.write().await;
        let mut taken: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();

        let created: Vec<MemoryRecord> = chunk_words(content)
            .into_iter()
            .map(|chunk| {
                let id = fresh_id(&mut taken);
                MemoryRecord::new(id, chunk, tags.clone(), kind)
            })
            .collect();

        let before = records.len();
        records.extend(created.iter().cloned());
        if let Err(e) = self.persist(&records) {
            records.truncate(before);
            return Err(e);
        }

        debug!(chunks = created.len(), kind = %kind, "Memory stored");
        Ok(created)
    }

    /// The `k` most relevant records for `query`.
    ///
    /// A query with no word tokens returns the `k` most recently inserted
    /// records, newest first.
    pub async fn search(&self, query: &str, k: usize) -> Vec<MemoryRecord> {
        let records = self.records.read().await;
        if crate::tfidf::tokenize(query).is_empty() {
            return records.iter().rev().take(k).cloned().collect();
        }
        rank(&records, query)
            .into_iter()
            .take(k)
            .map(|(i, _)| records[i].clone())
            .collect()
    }

    /// Remove the first record whose id starts with `prefix`.
    pub async fn delete(&self, prefix: &str) -> Result<bool, MemoryError> {
        if prefix.is_empty() {
            return Ok(false);
        }

        let mut records = self.records.write().await;
        let Some(pos) = records.iter().position(|r| r.id.starts_with(prefix)) else {
            return Ok(false);
        };

        let removed = records.remove(pos);
        if let Err(e) = self.persist(&records) {
            records.insert(pos, removed);
            return Err(e);
        }

        debug!(id = %removed.id, "Memory deleted");
        Ok(true)
    }

    /// Every record, in store order.
    pub async fn list(&self) -> Vec<MemoryRecord> {
        self.records.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    /// A bullet digest of the records relevant to `query`, ready for a
    /// system prompt. Empty when nothing qualifies.
    pub async fn context(&self, query: &str, max: usize) -> String {
        let records = self.search(query, max).await;
        if records.is_empty() {
            return String::new();
        }

        let mut lines = vec!["## Relevant Project Memories".to_string()];
        for record in &records {
            let mut prefix = format!("[{}]", record.kind);
            let tags = record.tag_label();
            if !tags.is_empty() {
                prefix.push(' ');
                prefix.push_str(&tags);
            }
            lines.push(format!("- {prefix} {}", record.content));
        }
        lines.join("\n")
    }
}

fn fresh_id(taken: &mut HashSet<String>) -> String {
    loop {
        let id: String = Uuid::new_v4().simple().to_string()[..ID_LEN].to_string();
        if taken.insert(id.clone()) {
            return id;
        }
    }
}
