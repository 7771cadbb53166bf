//! Shared test helpers: scripted provider, operator, and registry tools.

use async_trait::async_trait;
use localcoder_core::error::{ProviderError, ToolError};
use localcoder_core::provider::{ChatRequest, FrameReceiver, Provider, StreamFrame};
use localcoder_core::tool::{Tool, ToolArguments};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::operator::{Decision, Interrupted, Operator};
use crate::stream_event::AgentEvent;

pub type Script = Vec<Result<StreamFrame, ProviderError>>;

/// A provider that replays one scripted frame sequence per request.
///
/// Panics if more requests are made than scripts provided, unless built
/// with `repeating`.
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    repeat: Option<Script>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same script.
    pub fn repeating(script: Script) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            repeat: Some(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: ChatRequest) -> Result<FrameReceiver, ProviderError> {
        self.requests.lock().unwrap().push(request);

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat.clone())
            .expect("ScriptedProvider: no more scripts");

        let (tx, rx) = mpsc::channel(script.len() + 1);
        for frame in script {
            tx.try_send(frame).unwrap();
        }
        Ok(rx)
    }
}

/// A provider whose stream never produces a frame.
#[derive(Default)]
pub struct HangingProvider {
    senders: Mutex<Vec<mpsc::Sender<Result<StreamFrame, ProviderError>>>>,
}

#[async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn stream(&self, _request: ChatRequest) -> Result<FrameReceiver, ProviderError> {
        let (tx, rx) = mpsc::channel(1);
        self.senders.lock().unwrap().push(tx);
        Ok(rx)
    }
}

/// An operator with queued decisions and answers that records what it saw.
#[derive(Default)]
pub struct ScriptedOperator {
    decisions: Mutex<VecDeque<Decision>>,
    answers: Mutex<VecDeque<String>>,
    interrupt: bool,
    prompts: Mutex<Vec<String>>,
    questions: Mutex<Vec<String>>,
    events: Mutex<Vec<AgentEvent>>,
}

impl ScriptedOperator {
    pub fn with_decisions(self, decisions: impl IntoIterator<Item = Decision>) -> Self {
        self.decisions.lock().unwrap().extend(decisions);
        self
    }

    pub fn with_answers<S: Into<String>>(self, answers: impl IntoIterator<Item = S>) -> Self {
        self.answers
            .lock()
            .unwrap()
            .extend(answers.into_iter().map(Into::into));
        self
    }

    /// Report `Interrupted` from every prompt.
    pub fn interrupting(mut self) -> Self {
        self.interrupt = true;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn confirm(&self, synopsis: &str) -> Result<Decision, Interrupted> {
        self.prompts.lock().unwrap().push(synopsis.to_string());
        if self.interrupt {
            return Err(Interrupted);
        }
        Ok(self
            .decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Decision::Deny))
    }

    async fn ask(&self, question: &str) -> Result<String, Interrupted> {
        self.questions.lock().unwrap().push(question.to_string());
        if self.interrupt {
            return Err(Interrupted);
        }
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn notify(&self, event: &AgentEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// A registry tool that only counts its invocations.
#[derive(Clone)]
pub struct CountingTool {
    name: String,
    calls: Arc<AtomicUsize>,
}

impl CountingTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Counts invocations"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: &ToolArguments) -> Result<String, ToolError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("ran {n}"))
    }
}

/// A registry tool that never finishes on its own.
pub struct SleepingTool {
    name: String,
    started: Arc<AtomicUsize>,
}

impl SleepingTool {
    pub fn new(name: &str) -> (Self, Arc<AtomicUsize>) {
        let started = Arc::new(AtomicUsize::new(0));
        let tool = Self {
            name: name.to_string(),
            started: started.clone(),
        };
        (tool, started)
    }
}

#[async_trait]
impl Tool for SleepingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Sleeps for an hour"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _arguments: &ToolArguments) -> Result<String, ToolError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok("finished".into())
    }
}
