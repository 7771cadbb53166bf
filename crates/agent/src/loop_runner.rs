//! The agent reasoning loop implementation.
//!
//! One user turn runs as a sequence of bounded rounds. Each round streams a
//! response, then dispatches the tool calls it carried in order. A round is
//! staged and committed to history once it finishes. When a turn is
//! interrupted mid-batch, the calls that already ran are committed with their
//! results; the interrupted call and the rest of the batch are dropped.

use std::sync::Arc;

use localcoder_config::AppConfig;
use localcoder_core::error::{MemoryError, ProviderError, ToolError};
use localcoder_core::memory::MemoryKind;
use localcoder_core::message::{History, Message};
use localcoder_core::provider::{ChatRequest, Provider};
use localcoder_core::session::SessionContext;
use localcoder_core::tool::{ToolCall, ToolRegistry, ToolResult};
use localcoder_memory::MemoryStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::approval::{Approval, ApprovalGate};
use crate::assembler::{AssemblerEvent, StreamAssembler};
use crate::capability::{Capability, RecallArgs, RememberArgs, TaskCompleteArgs};
use crate::operator::{Decision, Interrupted, Operator};
use crate::prompt::build_system_prompt;
use crate::stream_event::AgentEvent;

/// Why a turn stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model replied without calling any tools
    Answered,
    /// The model closed the task with `task_complete`
    TaskComplete { summary: String },
    /// The round limit ran out while the model kept calling tools
    MaxRounds,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Stream(#[from] ProviderError),

    #[error("Interrupted.")]
    Interrupted,

    #[error("Nothing to send: input is empty")]
    EmptyInput,

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
}

impl From<Interrupted> for AgentError {
    fn from(_: Interrupted) -> Self {
        Self::Interrupted
    }
}

/// Text and calls collected from one streamed response.
#[derive(Debug, Default)]
struct Reply {
    text: String,
    calls: Vec<ToolCall>,
}

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    /// The model backend
    provider: Arc<dyn Provider>,

    /// Registry-backed tools (files, search, shell)
    tools: Arc<ToolRegistry>,

    /// Project memory, shared with the command surface
    memory: Arc<MemoryStore>,

    gate: ApprovalGate,

    /// Committed conversation, without the system prompt
    history: History,

    /// Maximum rounds per user turn
    max_rounds: usize,

    /// Memories placed in the system prompt each round
    context_limit: usize,

    /// Memories returned by `recall`
    search_limit: usize,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        memory: Arc<MemoryStore>,
    ) -> Self {
        Self {
            provider,
            tools,
            memory,
            gate: ApprovalGate::default(),
            history: History::new(),
            max_rounds: 15,
            context_limit: 5,
            search_limit: 5,
        }
    }

    /// Take round limit, approval set, and memory limits from the config.
    pub fn with_config(self, config: &AppConfig) -> Self {
        self.with_max_rounds(config.max_rounds)
            .with_approval_gate(ApprovalGate::new(config.tools.approval_required.iter().cloned()))
            .with_memory_limits(config.memory.context_limit, config.memory.search_limit)
    }

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    pub fn with_approval_gate(mut self, gate: ApprovalGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_memory_limits(mut self, context_limit: usize, search_limit: usize) -> Self {
        self.context_limit = context_limit;
        self.search_limit = search_limit;
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit
    }

    /// Forget the conversation. Memory is untouched.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Run one user turn to completion.
    ///
    /// Cancelling `cancel` stops the turn at the next suspension point. The
    /// user message stays in history, and so does any call of the current
    /// batch that finished before the interrupt.
    pub async fn run(
        &mut self,
        session: &mut SessionContext,
        input: &str,
        operator: &dyn Operator,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, AgentError> {
        if input.trim().is_empty() {
            return Err(AgentError::EmptyInput);
        }

        info!(
            model = %session.model,
            mode = session.mode_label(),
            history = self.history.len(),
            "Processing turn"
        );
        self.history.push(Message::user(input));

        let mut definitions = self.tools.definitions();
        definitions.extend(Capability::definitions());
        let mut tool_calls_made = 0;

        for round in 1..=self.max_rounds {
            let memory_context = self.memory.context(input, self.context_limit).await;
            let mut messages = Vec::with_capacity(self.history.len() + 1);
            messages.push(Message::system(build_system_prompt(
                &memory_context,
                session.planning,
            )));
            messages.extend(self.history.messages().iter().cloned());

            let request = ChatRequest {
                model: session.model.clone(),
                messages,
                tools: definitions.clone(),
            };

            debug!(round, messages = request.messages.len(), "Calling model");
            let reply = match self.stream_round(request, operator, cancel).await {
                Ok(reply) => reply,
                Err(AgentError::Stream(e)) => {
                    warn!(round, error = %e, "Model stream failed");
                    operator.notify(&AgentEvent::Error {
                        message: e.to_string(),
                    });
                    return Err(AgentError::Stream(e));
                }
                Err(e) => return Err(e),
            };
            let text = reply.text.trim().to_string();

            if reply.calls.is_empty() {
                self.history.push(Message::assistant(text));
                operator.notify(&AgentEvent::Done {
                    rounds: round,
                    tool_calls_made,
                });
                info!(rounds = round, tool_calls_made, "Turn answered");
                return Ok(TurnOutcome::Answered);
            }

            debug!(round, calls = reply.calls.len(), "Dispatching tool calls");
            let mut results = Vec::with_capacity(reply.calls.len());
            let mut completed = None;
            for call in &reply.calls {
                operator.notify(&AgentEvent::ToolCall {
                    name: call.name.clone(),
                    input: serde_json::Value::Object(call.arguments.clone()),
                });

                let (result, summary) = match self.dispatch(call, session, operator, cancel).await {
                    Ok(handled) => handled,
                    Err(e) => {
                        if !results.is_empty() {
                            debug!(round, kept = results.len(), "Committing calls finished before the interrupt");
                            self.commit_round(text, &reply.calls, results);
                        }
                        return Err(e);
                    }
                };
                tool_calls_made += 1;

                operator.notify(&AgentEvent::ToolResult {
                    name: call.name.clone(),
                    output: result.output.clone(),
                    success: result.success,
                });
                results.push(Message::tool_result(non_empty(result.output)));

                if summary.is_some() {
                    completed = summary;
                    break;
                }
            }

            self.commit_round(text, &reply.calls, results);

            if let Some(summary) = completed {
                operator.notify(&AgentEvent::Done {
                    rounds: round,
                    tool_calls_made,
                });
                info!(rounds = round, tool_calls_made, "Task complete");
                return Ok(TurnOutcome::TaskComplete { summary });
            }
        }

        warn!(max_rounds = self.max_rounds, "Max tool rounds reached");
        operator.notify(&AgentEvent::info("Reached maximum tool rounds. Stopping."));
        Ok(TurnOutcome::MaxRounds)
    }

    /// Append the assistant turn and its results. Only the calls that have a
    /// result are listed, so calls cut off by `task_complete` or an interrupt
    /// never appear without one.
    fn commit_round(&mut self, text: String, calls: &[ToolCall], results: Vec<Message>) {
        let dispatched = calls[..results.len()].to_vec();
        self.history.push(Message::assistant_with_calls(text, dispatched));
        self.history.extend(results);
    }

    async fn stream_round(
        &self,
        request: ChatRequest,
        operator: &dyn Operator,
        cancel: &CancellationToken,
    ) -> Result<Reply, AgentError> {
        let frames = tokio::select! {
            _ = cancel.cancelled() => return Err(AgentError::Interrupted),
            frames = self.provider.stream(request) => frames?,
        };

        let mut assembler = StreamAssembler::new(frames);
        let mut reply = Reply::default();
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return Err(AgentError::Interrupted),
                event = assembler.next_event() => event,
            };

            match event {
                Some(AssemblerEvent::Text(content)) => {
                    reply.text.push_str(&content);
                    operator.notify(&AgentEvent::Chunk { content });
                }
                Some(AssemblerEvent::Reasoning(content)) => {
                    operator.notify(&AgentEvent::Thought { content });
                }
                Some(AssemblerEvent::ToolCallReady(call)) => reply.calls.push(call),
                Some(AssemblerEvent::StreamError(e)) => return Err(e.into()),
                Some(AssemblerEvent::TurnDone) | None => return Ok(reply),
            }
        }
    }

    /// Handle one call. The second element carries the summary when the
    /// call completed the task.
    async fn dispatch(
        &self,
        call: &ToolCall,
        session: &mut SessionContext,
        operator: &dyn Operator,
        cancel: &CancellationToken,
    ) -> Result<(ToolResult, Option<String>), AgentError> {
        let capability = match Capability::resolve(call) {
            Ok(capability) => capability,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Rejected tool call");
                return Ok((ToolResult::from(Err::<String, _>(e)), None));
            }
        };

        if self.gate.classify(&call.name) == Approval::NeedsApproval {
            let synopsis = ApprovalGate::synopsis(call);
            let decision = tokio::select! {
                _ = cancel.cancelled() => return Err(AgentError::Interrupted),
                decision = operator.confirm(&synopsis) => decision?,
            };
            if decision == Decision::Deny {
                info!(tool = %call.name, "Tool call denied");
                operator.notify(&AgentEvent::Denied {
                    name: call.name.clone(),
                });
                let result = ToolResult::failure(format!("User denied execution of {}.", call.name));
                return Ok((result, None));
            }
        }

        let result = match capability {
            Capability::Remember(args) => self.remember(&args, session).await,
            Capability::Recall(args) => self.recall(&args).await,
            Capability::AskUser(args) => {
                let answer = tokio::select! {
                    _ = cancel.cancelled() => return Err(AgentError::Interrupted),
                    answer = operator.ask(&args.question) => answer?,
                };
                ToolResult::success(format!("User answered: {answer}"))
            }
            Capability::TaskComplete(args) => {
                let result = self.complete_task(&args, session).await;
                operator.notify(&AgentEvent::info(format!("Task complete: {}", args.summary)));
                return Ok((result, Some(args.summary)));
            }
            Capability::External => {
                let outcome = tokio::select! {
                    _ = cancel.cancelled() => return Err(AgentError::Interrupted),
                    outcome = self.tools.execute(call) => outcome,
                };
                if let Err(e) = &outcome {
                    debug!(tool = %call.name, error = %e, "Tool failed");
                }
                ToolResult::from(outcome)
            }
        };

        Ok((result, None))
    }

    async fn remember(&self, args: &RememberArgs, session: &mut SessionContext) -> ToolResult {
        if args.content.trim().is_empty() {
            return ToolResult::from(Err::<String, _>(ToolError::InvalidArguments {
                tool_name: "remember".into(),
                reason: "content must not be empty".into(),
            }));
        }

        match self
            .memory
            .insert(&args.content, args.tags(), MemoryKind::Project)
            .await
        {
            Ok(records) => {
                session.memory_count = self.memory.count().await;
                match records.as_slice() {
                    [single] => ToolResult::success(format!("Saved to memory (id: {}).", single.id)),
                    chunks => ToolResult::success(format!("Saved {} memory chunks.", chunks.len())),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to store memory");
                ToolResult::failure(format!("Error: {e}"))
            }
        }
    }

    async fn recall(&self, args: &RecallArgs) -> ToolResult {
        let records = self.memory.search(&args.query, self.search_limit).await;
        if records.is_empty() {
            return ToolResult::success("No relevant memories found.");
        }

        let lines: Vec<String> = records
            .iter()
            .map(|r| {
                let mut line = format!("[{}] {}", r.kind, r.content);
                if !r.tags.is_empty() {
                    line.push_str(&format!(" (tags: {})", r.tags.join(", ")));
                }
                line
            })
            .collect();
        ToolResult::success(lines.join("\n"))
    }

    async fn complete_task(&self, args: &TaskCompleteArgs, session: &mut SessionContext) -> ToolResult {
        if args.summary.trim().is_empty() {
            return ToolResult::success("Task complete.");
        }

        match self
            .memory
            .insert(&args.summary, Vec::new(), MemoryKind::Task)
            .await
        {
            Ok(_) => {
                session.memory_count = self.memory.count().await;
                ToolResult::success("Task summary saved to memory.")
            }
            Err(e) => {
                warn!(error = %e, "Failed to store task summary");
                ToolResult::failure(format!("Error: {e}"))
            }
        }
    }
}

/// Tool output as stored in history; empty output would be dropped.
fn non_empty(output: String) -> String {
    if output.trim().is_empty() {
        "(empty result)".into()
    } else {
        output
    }
}
