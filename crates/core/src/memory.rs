//! Memory record format shared by the store and the agent.
//!
//! Records are persisted one JSON object per line; the field names here are
//! the on-disk format (`type` for the kind, a second-precision UTC timestamp).

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a memory record was saved as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    /// A fact about the project, saved by `remember`
    #[default]
    Project,
    /// A completed-task summary, saved by `task_complete`
    Task,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => f.write_str("project"),
            Self::Task => f.write_str("task"),
        }
    }
}

/// A single persisted memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// 12 lowercase hex characters
    pub id: String,

    pub content: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(rename = "type", default)]
    pub kind: MemoryKind,

    #[serde(with = "second_precision")]
    pub timestamp: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
        kind: MemoryKind,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            tags,
            kind,
            timestamp: Utc::now().trunc_subsecs(0),
        }
    }

    /// `(tag1, tag2)`, or an empty string when untagged.
    pub fn tag_label(&self) -> String {
        if self.tags.is_empty() {
            String::new()
        } else {
            format!("({})", self.tags.join(", "))
        }
    }
}

/// `2026-10-19T08:15:02+00:00` on the wire.
mod second_precision {
    use chrono::{DateTime, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc).trunc_subsecs(0))
            .map_err(serde::de::Error::custom)
    }
}
