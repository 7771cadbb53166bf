//! Streaming response assembly.
//!
//! Turns the provider's raw `StreamFrame`s into semantic events. Text inside
//! `<think>…</think>` is reported as reasoning and never reaches the
//! persisted reply, even when a delimiter is split across frames.

use localcoder_core::error::ProviderError;
use localcoder_core::provider::FrameReceiver;
use localcoder_core::tool::ToolCall;
use std::collections::VecDeque;

const OPEN: &str = "<think>";
const CLOSE: &str = "</think>";

/// One semantic event of an assembled response.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblerEvent {
    /// User-visible text that is kept in history
    Text(String),
    /// Model reasoning, shown transiently and never stored
    Reasoning(String),
    ToolCallReady(ToolCall),
    TurnDone,
    StreamError(ProviderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InReasoning,
}

/// Incremental two-state splitter for reasoning delimiters.
///
/// Text is released as soon as it cannot be the start of the delimiter the
/// scanner is waiting for; only a trailing partial delimiter is held back.
#[derive(Debug)]
pub struct ReasoningScanner {
    state: ScanState,
    pending: String,
}

impl Default for ReasoningScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ReasoningScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Normal,
            pending: String::new(),
        }
    }

    /// Feed one fragment, returning the `Text`/`Reasoning` events it releases.
    pub fn feed(&mut self, fragment: &str) -> Vec<AssemblerEvent> {
        let mut buf = std::mem::take(&mut self.pending);
        buf.push_str(fragment);

        let mut events = Vec::new();
        loop {
            let delimiter = self.awaited();
            if let Some(pos) = buf.find(delimiter) {
                self.emit(&buf[..pos], &mut events);
                buf.drain(..pos + delimiter.len());
                self.state = match self.state {
                    ScanState::Normal => ScanState::InReasoning,
                    ScanState::InReasoning => ScanState::Normal,
                };
                continue;
            }

            let hold = partial_suffix(&buf, delimiter);
            let split = buf.len() - hold;
            self.emit(&buf[..split], &mut events);
            self.pending = buf[split..].to_string();
            return events;
        }
    }

    /// Release whatever is still held back, in the current state's kind.
    pub fn finish(&mut self) -> Option<AssemblerEvent> {
        let rest = std::mem::take(&mut self.pending);
        let mut events = Vec::with_capacity(1);
        self.emit(&rest, &mut events);
        events.pop()
    }

    fn awaited(&self) -> &'static str {
        match self.state {
            ScanState::Normal => OPEN,
            ScanState::InReasoning => CLOSE,
        }
    }

    fn emit(&self, text: &str, events: &mut Vec<AssemblerEvent>) {
        if text.is_empty() {
            return;
        }
        events.push(match self.state {
            ScanState::Normal => AssemblerEvent::Text(text.to_string()),
            ScanState::InReasoning => AssemblerEvent::Reasoning(text.to_string()),
        });
    }
}

/// Length of the longest suffix of `buf` that is a proper prefix of `delimiter`.
fn partial_suffix(buf: &str, delimiter: &str) -> usize {
    (1..delimiter.len())
        .rev()
        .find(|&k| buf.ends_with(&delimiter[..k]))
        .unwrap_or(0)
}

/// Pulls frames from a provider stream and yields `AssemblerEvent`s lazily.
///
/// After `TurnDone` or `StreamError` the assembler yields nothing more.
pub struct StreamAssembler {
    frames: FrameReceiver,
    scanner: ReasoningScanner,
    queue: VecDeque<AssemblerEvent>,
    finished: bool,
}

impl StreamAssembler {
    pub fn new(frames: FrameReceiver) -> Self {
        Self {
            frames,
            scanner: ReasoningScanner::new(),
            queue: VecDeque::new(),
            finished: false,
        }
    }

    /// The next event, or `None` once the response is over.
    pub async fn next_event(&mut self) -> Option<AssemblerEvent> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }

            match self.frames.recv().await {
                Some(Ok(frame)) => {
                    if let Some(content) = frame.content.as_deref() {
                        self.queue.extend(self.scanner.feed(content));
                    }
                    self.queue
                        .extend(frame.tool_calls.into_iter().map(AssemblerEvent::ToolCallReady));
                    if frame.done {
                        self.end();
                    }
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(AssemblerEvent::StreamError(e));
                }
                None => self.end(),
            }
        }
    }

    fn end(&mut self) {
        self.queue.extend(self.scanner.finish());
        self.queue.push_back(AssemblerEvent::TurnDone);
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localcoder_core::provider::StreamFrame;
    use localcoder_core::tool::ToolArguments;

    fn split(events: &[AssemblerEvent]) -> (String, String) {
        let mut text = String::new();
        let mut reasoning = String::new();
        for event in events {
            match event {
                AssemblerEvent::Text(t) => text.push_str(t),
                AssemblerEvent::Reasoning(r) => reasoning.push_str(r),
                _ => {}
            }
        }
        (text, reasoning)
    }

    fn scan(fragments: &[&str]) -> (String, String) {
        let mut scanner = ReasoningScanner::new();
        let mut events = Vec::new();
        for f in fragments {
            events.extend(scanner.feed(f));
        }
        events.extend(scanner.finish());
        split(&events)
    }

    #[test]
    fn delimiter_split_across_fragments() {
        let mut scanner = ReasoningScanner::new();
        let first = scanner.feed("a<th");
        assert_eq!(first, vec![AssemblerEvent::Text("a".into())]);

        let second = scanner.feed("ink>secret</think>b");
        assert_eq!(
            second,
            vec![
                AssemblerEvent::Reasoning("secret".into()),
                AssemblerEvent::Text("b".into()),
            ]
        );
        assert!(scanner.finish().is_none());
    }

    #[test]
    fn every_split_point_gives_the_same_result() {
        let full = "intro <think>plan the edit</think>done <think>more</think>!";
        for i in 0..=full.len() {
            let (a, b) = full.split_at(i);
            assert_eq!(
                scan(&[a, b]),
                ("intro done !".to_string(), "plan the editmore".to_string()),
                "split at {i}"
            );
        }
    }

    #[test]
    fn one_char_at_a_time() {
        let full = "x<think>y</think>z";
        let chars: Vec<String> = full.chars().map(String::from).collect();
        let refs: Vec<&str> = chars.iter().map(String::as_str).collect();
        assert_eq!(scan(&refs), ("xz".to_string(), "y".to_string()));
    }

    #[test]
    fn lookalike_text_is_released() {
        let mut scanner = ReasoningScanner::new();
        assert_eq!(scanner.feed("a <thin"), vec![AssemblerEvent::Text("a ".into())]);
        assert_eq!(scanner.feed("g>"), vec![AssemblerEvent::Text("<thing>".into())]);
    }

    #[test]
    fn held_back_suffix_is_flushed_in_current_state() {
        let mut scanner = ReasoningScanner::new();
        scanner.feed("end <");
        assert_eq!(scanner.finish(), Some(AssemblerEvent::Text("<".into())));

        let mut scanner = ReasoningScanner::new();
        scanner.feed("<think>unfinished</thi");
        assert_eq!(scanner.finish(), Some(AssemblerEvent::Reasoning("</thi".into())));
    }

    #[test]
    fn multibyte_text_near_delimiters() {
        assert_eq!(
            scan(&["héllo <thi", "nk>ré</think>wörld"]),
            ("héllo wörld".to_string(), "ré".to_string())
        );
    }

    fn frames(items: Vec<Result<StreamFrame, ProviderError>>) -> FrameReceiver {
        let (tx, rx) = tokio::sync::mpsc::channel(items.len() + 1);
        for item in items {
            tx.try_send(item).unwrap();
        }
        rx
    }

    async fn collect(mut assembler: StreamAssembler) -> Vec<AssemblerEvent> {
        let mut events = Vec::new();
        while let Some(event) = assembler.next_event().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn assembles_text_calls_and_done() {
        let call = ToolCall::new("recall", ToolArguments::new());
        let rx = frames(vec![
            Ok(StreamFrame::text("a<th")),
            Ok(StreamFrame::text("ink>secret</think>b")),
            Ok(StreamFrame::tool_call(call.clone())),
            Ok(StreamFrame::done()),
            Ok(StreamFrame::text("ignored after done")),
        ]);

        let events = collect(StreamAssembler::new(rx)).await;
        assert_eq!(
            events,
            vec![
                AssemblerEvent::Text("a".into()),
                AssemblerEvent::Reasoning("secret".into()),
                AssemblerEvent::Text("b".into()),
                AssemblerEvent::ToolCallReady(call),
                AssemblerEvent::TurnDone,
            ]
        );
    }

    #[tokio::test]
    async fn clean_close_is_turn_done() {
        let rx = frames(vec![Ok(StreamFrame::text("hi <"))]);
        let events = collect(StreamAssembler::new(rx)).await;
        assert_eq!(
            events,
            vec![
                AssemblerEvent::Text("hi ".into()),
                AssemblerEvent::Text("<".into()),
                AssemblerEvent::TurnDone,
            ]
        );
    }

    #[tokio::test]
    async fn error_ends_the_sequence() {
        let rx = frames(vec![
            Ok(StreamFrame::text("part <thi")),
            Err(ProviderError::Timeout(300)),
            Ok(StreamFrame::text("never seen")),
        ]);
        let events = collect(StreamAssembler::new(rx)).await;
        assert_eq!(
            events,
            vec![
                AssemblerEvent::Text("part ".into()),
                AssemblerEvent::StreamError(ProviderError::Timeout(300)),
            ]
        );
    }
}
