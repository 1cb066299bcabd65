//! Shared test doubles for the agent crate.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use localpilot_core::error::{ProviderError, ToolError};
use localpilot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use localpilot_core::tool::{ToolCall, ToolDefinition, ToolGateway, ToolResult};
use serde_json::json;

/// A provider that replays scripted replies in order.
///
/// Once the script runs out, the `repeat` reply (if any) is returned forever;
/// otherwise further calls fail with `InvalidResponse`.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    repeat: Option<String>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<&str>) -> Self {
        Self::from_results(replies.into_iter().map(Ok).collect())
    }

    /// Replies and failures, in call order.
    pub fn from_results(results: Vec<Result<&str, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(
                results
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
            repeat: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that returns `reply` on every call.
    pub fn repeating(reply: &str) -> Self {
        let mut p = Self::new(vec![]);
        p.repeat = Some(reply.to_string());
        p
    }

    /// A provider whose next call fails.
    pub fn failing(error: ProviderError) -> Self {
        Self::from_results(vec![Err(error)])
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        // Taken before the delay so a cancelled call still consumes its reply.
        let next = self.script.lock().unwrap().pop_front();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let content = match next {
            Some(reply) => reply?,
            None => self
                .repeat
                .clone()
                .ok_or_else(|| ProviderError::InvalidResponse("script exhausted".into()))?,
        };

        Ok(ProviderResponse {
            content,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

/// A tool gateway backed by an in-memory file map that records every call.
///
/// Offers `read_file {path}` and `write_file {path, content}`.
pub struct RecordingGateway {
    files: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<(ToolCall, Instant, Instant)>>,
    latency: Option<Duration>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn put_file(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }

    /// Completed calls in completion order.
    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _, _)| c.clone())
            .collect()
    }

    /// `(name, started, finished)` per completed call.
    pub fn timings(&self) -> Vec<(String, Instant, Instant)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(c, s, f)| (c.name.clone(), *s, *f))
            .collect()
    }
}

#[async_trait]
impl ToolGateway for RecordingGateway {
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let started = Instant::now();
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let path = call.parameters["path"].as_str().unwrap_or_default().to_string();
        let result = match call.name.as_str() {
            "read_file" => match self.files.lock().unwrap().get(&path) {
                Some(content) => ToolResult::file_content(&call.id, &path, content.clone()),
                None => ToolResult::error(&call.id, format!("File not found: {path}")),
            },
            "write_file" => {
                let content = call.parameters["content"].as_str().unwrap_or_default();
                self.files
                    .lock()
                    .unwrap()
                    .insert(path.clone(), content.to_string());
                ToolResult::success(&call.id, format!("Wrote {path}"))
            }
            other => return Err(ToolError::NotFound(other.to_string())),
        };

        self.calls
            .lock()
            .unwrap()
            .push((call.clone(), started, Instant::now()));
        Ok(result)
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "read_file".into(),
                description: "Read a file".into(),
                parameters: json!({
                    "type": "object",
                    "properties": { "path": { "type": "string" } },
                    "required": ["path"]
                }),
            },
            ToolDefinition {
                name: "write_file".into(),
                description: "Write a file".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "content": { "type": "string" }
                    },
                    "required": ["path", "content"]
                }),
            },
        ]
    }
}

/// A fenced reply carrying `calls` as `(id, name, parameters)`.
pub fn tool_reply(thought: &str, calls: &[(&str, &str, serde_json::Value)]) -> String {
    let calls: Vec<serde_json::Value> = calls
        .iter()
        .map(|(id, name, params)| json!({"id": id, "name": name, "parameters": params}))
        .collect();
    format!(
        "```json\n{}\n```",
        json!({"thought": thought, "tool_calls": calls})
    )
}
