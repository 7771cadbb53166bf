//! TF-IDF keyword relevance over memory records.
//!
//! A record's term set is its content words plus its tag words; term
//! frequency is measured over the content alone.

use localcoder_core::memory::MemoryRecord;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// Lowercased `\w+` runs (Unicode word characters, combining marks included).
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

/// Score every record against `query`.
///
/// Returns `(index, score)` pairs for records with a positive score, highest
/// first; equal scores keep store order. Query terms are deduplicated.
pub fn rank(records: &[MemoryRecord], query: &str) -> Vec<(usize, f64)> {
    let mut seen = HashSet::new();
    let terms: Vec<String> = tokenize(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect();
    if terms.is_empty() || records.is_empty() {
        return Vec::new();
    }

    let term_sets: Vec<HashSet<String>> = records
        .iter()
        .map(|r| {
            let mut set: HashSet<String> = tokenize(&r.content).into_iter().collect();
            for tag in &r.tags {
                set.extend(tokenize(tag));
            }
            set
        })
        .collect();

    let mut df: HashMap<&str, usize> = HashMap::new();
    for set in &term_sets {
        for term in set {
            *df.entry(term.as_str()).or_default() += 1;
        }
    }

    let n = records.len() as f64;
    let mut scored: Vec<(usize, f64)> = records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| {
            let shared: Vec<&String> = terms.iter().filter(|t| term_sets[i].contains(*t)).collect();
            if shared.is_empty() {
                return None;
            }

            let content_terms = tokenize(&record.content);
            let total = content_terms.len().max(1) as f64;
            let mut tf: HashMap<&str, usize> = HashMap::new();
            for term in &content_terms {
                *tf.entry(term.as_str()).or_default() += 1;
            }

            let score: f64 = shared
                .iter()
                .map(|term| {
                    let freq = tf.get(term.as_str()).copied().unwrap_or(0) as f64 / total;
                    let docs = df.get(term.as_str()).copied().unwrap_or(0) as f64;
                    freq * ((n + 1.0) / (docs + 1.0)).ln()
                })
                .sum();

            (score > 0.0).then_some((i, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}
