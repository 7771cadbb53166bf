//! Ollama chat provider.
//!
//! Talks to a local Ollama server's native API:
//! - `POST /api/chat` with `stream: true` (newline-delimited JSON frames)
//! - `GET /api/tags` for health checks and model listing
//! - `POST /api/pull` to download a missing model, with streamed progress
//!
//! Tool calls arrive whole inside a frame's `message.tool_calls`, so no
//! delta accumulation is needed; every NDJSON line maps to one `StreamFrame`.

use async_trait::async_trait;
use futures::StreamExt;
use localcoder_config::AppConfig;
use localcoder_core::error::ProviderError;
use localcoder_core::message::{Message, Role};
use localcoder_core::provider::{ChatRequest, FrameReceiver, StreamFrame, ToolDefinition};
use localcoder_core::tool::{ToolArguments, ToolCall};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Deadline for a model download; pulls of large models take a long time.
const PULL_TIMEOUT_SECS: u64 = 6 * 60 * 60;

/// A provider backed by a local Ollama server.
pub struct OllamaProvider {
    base_url: String,
    temperature: f32,
    num_ctx: u32,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for `base_url` with an overall request deadline.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            temperature: 0.7,
            num_ctx: 8192,
            timeout_secs,
            client,
        })
    }

    /// Build a provider from the loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(&config.base_url, config.request_timeout_secs)?
            .with_options(config.temperature, config.num_ctx))
    }

    /// Set the sampling options sent with every request.
    pub fn with_options(mut self, temperature: f32, num_ctx: u32) -> Self {
        self.temperature = temperature;
        self.num_ctx = num_ctx;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether `model` is pulled: an exact tag match, or `model` naming a
    /// family that has a pulled tag (`qwen3` matches `qwen3:8b`).
    pub async fn has_model(&self, model: &str) -> Result<bool, ProviderError> {
        let models = self.fetch_tags().await?;
        Ok(model_matches(&models, model))
    }

    /// Download `model`, passing each progress line (`"pulling abc: 42%"`,
    /// `"success"`) to `progress` as it arrives.
    pub async fn pull_model(&self, model: &str, mut progress: impl FnMut(&str)) -> Result<(), ProviderError> {
        let url = format!("{}/api/pull", self.base_url);
        info!(model, "Pulling model");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": model }))
            .timeout(Duration::from_secs(PULL_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Model pull rejected");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_message(&error_body),
            });
        }

        let mut byte_stream = response.bytes_stream();
        let mut lines = LineBuffer::default();
        while let Some(chunk_result) = byte_stream.next().await {
            let bytes = chunk_result.map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(PULL_TIMEOUT_SECS)
                } else {
                    ProviderError::StreamInterrupted(e.to_string())
                }
            })?;
            for line in lines.push(&bytes) {
                if let Some(text) = pull_status(&line)? {
                    progress(&text);
                }
            }
        }
        if let Some(line) = lines.finish() {
            if let Some(text) = pull_status(&line)? {
                progress(&text);
            }
        }

        debug!(model, "Model pull finished");
        Ok(())
    }

    async fn fetch_tags(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status_code: status,
                message,
            });
        }

        let tags: TagsResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse model list: {e}"),
        })?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn build_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": true,
            "options": {
                "temperature": self.temperature,
                "num_ctx": self.num_ctx,
            },
        });
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }
        body
    }

    /// Convert our Message types to Ollama's chat format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: m.content.clone(),
                tool_calls: m
                    .tool_calls
                    .iter()
                    .map(|tc| ApiToolCall {
                        function: ApiFunction {
                            name: tc.name.clone(),
                            arguments: serde_json::Value::Object(tc.arguments.clone()),
                        },
                    })
                    .collect(),
            })
            .collect()
    }

    /// Convert tool definitions to Ollama's function-tool format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn map_transport(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout_secs)
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl localcoder_core::Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn stream(&self, request: ChatRequest) -> Result<FrameReceiver, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.build_body(&request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending streaming chat request"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status().as_u16();

        if status == 404 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Model not available");
            return Err(ProviderError::ModelNotFound(request.model));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Ollama streaming error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_message(&error_body),
            });
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let timeout_secs = self.timeout_secs;

        // Read the NDJSON byte stream, one frame per line
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = LineBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let err = if e.is_timeout() {
                            ProviderError::Timeout(timeout_secs)
                        } else {
                            ProviderError::StreamInterrupted(e.to_string())
                        };
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                };

                for line in lines.push(&bytes) {
                    match parse_line(&line) {
                        ParsedLine::Frame(frame) => {
                            let done = frame.done;
                            if tx.send(Ok(frame)).await.is_err() {
                                return; // receiver dropped
                            }
                            if done {
                                return;
                            }
                        }
                        ParsedLine::Error(message) => {
                            let _ = tx.send(Err(ProviderError::StreamInterrupted(message))).await;
                            return;
                        }
                        ParsedLine::Skip => {}
                    }
                }
            }

            // A final line without a trailing newline
            if let Some(line) = lines.finish() {
                match parse_line(&line) {
                    ParsedLine::Frame(frame) => {
                        let _ = tx.send(Ok(frame)).await;
                    }
                    ParsedLine::Error(message) => {
                        let _ = tx.send(Err(ProviderError::StreamInterrupted(message))).await;
                    }
                    ParsedLine::Skip => {}
                }
            }
            debug!("Chat stream closed");
        });

        Ok(rx)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        self.fetch_tags().await
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        match self.fetch_tags().await {
            Ok(_) => Ok(true),
            Err(ProviderError::Network(_)) | Err(ProviderError::Timeout(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn model_matches(available: &[String], model: &str) -> bool {
    let family = format!("{model}:");
    available
        .iter()
        .any(|name| name == model || name.starts_with(&family))
}

/// Ollama error bodies look like `{"error": "..."}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.to_string())
}

/// Render one `/api/pull` progress line. Layer downloads carry byte counts
/// and are shown as a percentage; an `error` field fails the pull.
fn pull_status(line: &str) -> Result<Option<String>, ProviderError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let progress: PullProgress = match serde_json::from_str(line) {
        Ok(p) => p,
        Err(e) => {
            trace!(data = %line, error = %e, "Ignoring unparseable pull line");
            return Ok(None);
        }
    };

    if let Some(error) = progress.error {
        return Err(ProviderError::StreamInterrupted(error));
    }
    Ok(Some(match progress.total {
        Some(total) if total > 0 => {
            let pct = progress.completed.unwrap_or(0).saturating_mul(100) / total;
            format!("{}: {pct}%", progress.status)
        }
        _ => progress.status,
    }))
}

/// Splits a byte stream into complete lines, holding back a partial line
/// (including a partial UTF-8 sequence) until its newline arrives.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1])
                .trim_end_matches('\r')
                .to_string();
            lines.push(line);
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!line.is_empty()).then_some(line)
    }
}

#[derive(Debug, PartialEq)]
enum ParsedLine {
    Frame(StreamFrame),
    Error(String),
    Skip,
}

fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() {
        return ParsedLine::Skip;
    }

    let chunk: ChatChunk = match serde_json::from_str(line) {
        Ok(c) => c,
        Err(e) => {
            trace!(data = %line, error = %e, "Ignoring unparseable NDJSON line");
            return ParsedLine::Skip;
        }
    };

    if let Some(error) = chunk.error {
        return ParsedLine::Error(error);
    }

    let (content, tool_calls) = match chunk.message {
        Some(message) => {
            let calls = message
                .tool_calls
                .into_iter()
                .filter_map(|tc| {
                    let arguments = arguments_from(tc.function.arguments)?;
                    Some(ToolCall::new(tc.function.name, arguments))
                })
                .collect();
            (message.content.filter(|c| !c.is_empty()), calls)
        }
        None => (None, Vec::new()),
    };

    ParsedLine::Frame(StreamFrame {
        content,
        tool_calls,
        done: chunk.done,
    })
}

/// Arguments normally arrive as an object; some models emit a JSON string.
fn arguments_from(value: serde_json::Value) -> Option<ToolArguments> {
    match value {
        serde_json::Value::Object(map) => Some(map),
        serde_json::Value::Null => Some(ToolArguments::new()),
        serde_json::Value::String(raw) if raw.trim().is_empty() => Some(ToolArguments::new()),
        serde_json::Value::String(raw) => match serde_json::from_str(&raw) {
            Ok(serde_json::Value::Object(map)) => Some(map),
            _ => {
                warn!(arguments = %raw, "Dropping tool call with non-object arguments");
                None
            }
        },
        other => {
            warn!(arguments = %other, "Dropping tool call with non-object arguments");
            None
        }
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// One NDJSON line of a streaming `/api/chat` response.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

/// One NDJSON line of a streaming `/api/pull` response.
#[derive(Debug, Deserialize)]
struct PullProgress {
    #[serde(default)]
    status: String,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}
