//! Overlapping word-window chunking for long memory content.

/// Maximum words per stored record.
pub const CHUNK_WORDS: usize = 500;

/// Words shared between consecutive windows.
pub const CHUNK_OVERLAP: usize = 50;

/// Split `text` into windows of at most [`CHUNK_WORDS`] whitespace-separated
/// words, each starting `CHUNK_WORDS - CHUNK_OVERLAP` words after the last.
///
/// Content that fits in one window is returned unmodified. Otherwise the
/// windows are rejoined with single spaces and the last window is the first
/// one that reaches the final word.
pub fn chunk_words(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= CHUNK_WORDS {
        return vec![text.to_string()];
    }

    let step = CHUNK_WORDS - CHUNK_OVERLAP;
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + CHUNK_WORDS).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}
