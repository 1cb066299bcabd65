//! The agent reasoning loop.
//!
//! One [`AgentLoop`] owns one session: a conversation and a master context.
//! Each [`AgentLoop::chat`] call runs the whole cycle (assemble context, fit
//! the budget, then alternate model calls and tool batches) and always
//! resolves to text. A newer `chat` on the same instance cancels the older
//! one.

use std::sync::{Arc, Mutex, PoisonError};

use localpilot_config::AppConfig;
use localpilot_core::error::Error;
use localpilot_core::fs::FileReader;
use localpilot_core::message::{Conversation, Message, Role};
use localpilot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use localpilot_core::tool::ToolGateway;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::ToolBridge;
use crate::context::{BudgetStatus, ContextAssembler, ContextItem, TokenManager};
use crate::interpreter::{self, EMPTY_RESPONSE_NOTICE, ModelReply};
use crate::progress::{Progress, ProgressCallback, ProgressEvent};
use crate::prompt::{self, CONDENSE_PROMPT, TURN_LIMIT_PROMPT};

/// Returned by `chat` when the request was cancelled.
pub const CANCELLED_MESSAGE: &str = "[Request cancelled]";

/// Separates the user's message from the context block.
const CONTEXT_SEPARATOR: &str = "\n\n# Context\n\n";

/// Appended to a context block cut by characters to fit the budget.
const HARD_CUT_MARKER: &str = "\n[... context truncated to fit the token limit]";

/// Loop settings taken from configuration.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub model: String,
    pub temperature: f32,
    pub max_response_tokens: Option<u32>,
    pub max_turns: usize,
    pub max_empty_retries: usize,
    pub verbose_events: bool,
    pub condense_context: bool,
    pub system_prompt_override: Option<String>,
    pub max_file_lines: usize,
    pub max_window_tokens: usize,
}

impl AgentOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.name.clone(),
            temperature: config.model.temperature,
            max_response_tokens: config.model.max_response_tokens,
            max_turns: config.agent.max_turns,
            max_empty_retries: config.agent.max_empty_retries,
            verbose_events: config.agent.verbose_events,
            condense_context: config.agent.condense_context,
            system_prompt_override: config.agent.system_prompt_override.clone(),
            max_file_lines: config.context.max_file_lines,
            max_window_tokens: config.context.max_window_tokens,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Session state, touched by one `chat` at a time.
struct Session {
    conversation: Conversation,
    assembler: ContextAssembler,
}

/// Token estimates for the request being built.
#[derive(Debug, Default, Clone, Copy)]
struct RequestSize {
    system: usize,
    context: usize,
    user: usize,
}

impl RequestSize {
    fn total(&self) -> usize {
        self.system + self.context + self.user
    }
}

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    /// The model backend
    provider: Arc<dyn Provider>,

    /// Validates and dispatches tool calls
    bridge: ToolBridge,

    /// Shared budget policy
    tokens: Arc<TokenManager>,

    options: AgentOptions,

    session: tokio::sync::Mutex<Session>,

    /// Token of the most recent `chat` call
    current: Mutex<CancellationToken>,
}

impl AgentLoop {
    /// Create an agent with a fresh session.
    ///
    /// The system prompt is built once from the gateway's tool definitions.
    pub fn new(
        provider: Arc<dyn Provider>,
        gateway: Arc<dyn ToolGateway>,
        reader: Arc<dyn FileReader>,
        tokens: Arc<TokenManager>,
        options: AgentOptions,
    ) -> Self {
        let bridge = ToolBridge::new(gateway);
        let system_prompt = prompt::build_system_prompt(
            options.system_prompt_override.as_deref(),
            bridge.definitions(),
        );
        let assembler = ContextAssembler::new(reader, tokens.clone())
            .with_max_file_lines(options.max_file_lines)
            .with_max_window_tokens(options.max_window_tokens);

        Self {
            provider,
            bridge,
            tokens,
            options,
            session: tokio::sync::Mutex::new(Session {
                conversation: Conversation::new(system_prompt),
                assembler,
            }),
            current: Mutex::new(CancellationToken::new()),
        }
    }

    /// Process a user message and return the final answer.
    ///
    /// Never fails: provider errors come back as `"Error: ..."` text and
    /// cancellation as [`CANCELLED_MESSAGE`].
    pub async fn chat(
        &self,
        message: &str,
        items: &[ContextItem],
        on_update: Option<ProgressCallback>,
    ) -> String {
        let cancel = self.begin_request();
        let progress = Progress::new(on_update, self.options.verbose_events);

        let mut size = RequestSize::default();
        let mut usage: Option<Usage> = None;

        let result = {
            let mut session = self.session.lock().await;
            let start = session.conversation.len();
            let result = self
                .run(&mut session, message, items, &cancel, &progress, &mut size, &mut usage)
                .await;
            if let Err(e) = &result {
                close_interrupted(&mut session.conversation, start, &failure_text(e));
            }
            result
        };

        progress.emit(ProgressEvent::Tokens {
            system: size.system,
            context: size.context,
            user: size.user,
            total: size.total(),
            usage,
        });

        match result {
            Ok(answer) => answer,
            Err(e) if e.is_cancelled() => {
                info!("Request cancelled");
                progress.emit(ProgressEvent::Warning {
                    message: "Request cancelled".into(),
                });
                failure_text(&e)
            }
            Err(e) => {
                warn!(error = %e, "Request failed");
                let text = failure_text(&e);
                progress.emit(ProgressEvent::Error {
                    message: text.clone(),
                });
                text
            }
        }
    }

    /// Cancel the in-flight `chat`, if any.
    pub fn cancel(&self) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Cancel any in-flight request, then clear the conversation back to
    /// its system prompt and empty the master context.
    pub async fn reset_context(&self) {
        self.cancel();
        let mut session = self.session.lock().await;
        session.conversation.clear();
        session.assembler.clear_master();
        info!("Session context reset");
    }

    /// Copy of the conversation, system prompt first.
    pub async fn history(&self) -> Vec<Message> {
        self.session.lock().await.conversation.history()
    }

    /// A value from the master context.
    pub async fn master_value(&self, key: &str) -> Option<String> {
        self.session
            .lock()
            .await
            .assembler
            .get_from_master(key)
            .map(str::to_string)
    }

    fn begin_request(&self) -> CancellationToken {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.cancel();
        *current = CancellationToken::new();
        current.clone()
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        session: &mut Session,
        message: &str,
        items: &[ContextItem],
        cancel: &CancellationToken,
        progress: &Progress,
        size: &mut RequestSize,
        usage: &mut Option<Usage>,
    ) -> Result<String, Error> {
        let Session {
            conversation,
            assembler,
        } = session;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // ── Context assembly ──
        let mut context = String::new();
        if !items.is_empty() {
            assembler.record_task(message, items).await;
            context = assembler.attachment_within(assembler.max_window_tokens());
            progress.emit(ProgressEvent::ContextAdded {
                items: items.len(),
                tokens: self.tokens.count(&context),
            });
        }

        // ── Budget ──
        *size = RequestSize {
            system: self.tokens.count(conversation.system_prompt()),
            context: self.context_cost(&context),
            user: self.tokens.count(message),
        };
        context = self
            .fit_budget(assembler, context, size, cancel, progress, usage)
            .await?;

        debug!(
            system = size.system,
            context = size.context,
            user = size.user,
            total = size.total(),
            "Request size"
        );

        if context.is_empty() {
            conversation.append_user(message);
        } else {
            conversation.append_user(format!("{message}{CONTEXT_SEPARATOR}{context}"));
        }

        // ── Turn loop ──
        let mut empty_retries = 0;
        for turn in 1..=self.options.max_turns {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            debug!(turn, messages = conversation.len(), "Agent turn");
            progress.emit(ProgressEvent::Thinking { turn });

            let response = self.call_model(conversation.history(), cancel).await?;
            tally(usage, &response);

            match interpreter::parse(&response.content) {
                ModelReply::Empty => {
                    if empty_retries < self.options.max_empty_retries {
                        empty_retries += 1;
                        warn!(turn, empty_retries, "Model returned an empty response, retrying");
                        progress.emit(ProgressEvent::Warning {
                            message: format!(
                                "Empty response from model, retrying ({empty_retries}/{})",
                                self.options.max_empty_retries
                            ),
                        });
                        continue;
                    }
                    conversation.append_assistant(EMPTY_RESPONSE_NOTICE);
                    return Ok(EMPTY_RESPONSE_NOTICE.to_string());
                }

                ModelReply::Text(text) => {
                    conversation.append_assistant(text.clone());
                    info!(turns = turn, "Agent finished");
                    return Ok(text);
                }

                ModelReply::Structured {
                    thought,
                    tool_calls,
                } => {
                    if let Some(thought) = thought.as_deref().filter(|t| !t.is_empty()) {
                        progress.emit(ProgressEvent::Thought {
                            content: thought.to_string(),
                        });
                    }

                    if tool_calls.is_empty() {
                        let answer = thought
                            .filter(|t| !t.trim().is_empty())
                            .unwrap_or_else(|| response.content.clone());
                        conversation.append_assistant(answer.clone());
                        info!(turns = turn, "Agent finished");
                        return Ok(answer);
                    }

                    // Keep the raw payload so the model sees its own format.
                    conversation.append_assistant(response.content.clone());
                    debug!(turn, tool_count = tool_calls.len(), "Executing tool calls");

                    for call in &tool_calls {
                        if cancel.is_cancelled() {
                            info!(turn, tool = %call.name, "Cancelled before tool call");
                            return Err(Error::Cancelled);
                        }

                        progress.emit(ProgressEvent::ToolStart {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            parameters: call.parameters.clone(),
                        });

                        let result = self
                            .bridge
                            .execute(call, conversation, assembler.master_mut())
                            .await;

                        let shown = if result.is_success() {
                            progress.tool_output(&result.output)
                        } else {
                            result.error.clone().unwrap_or_default()
                        };
                        progress.emit(ProgressEvent::ToolEnd {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            success: result.is_success(),
                            output: shown,
                        });
                    }

                    conversation.ensure_role_alternation();
                }
            }
        }

        // ── Turn limit ──
        let max_turns = self.options.max_turns;
        warn!(max_turns, "Turn limit reached, requesting progress summary");
        progress.emit(ProgressEvent::Warning {
            message: format!("Turn limit of {max_turns} reached"),
        });

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        conversation.append_user(TURN_LIMIT_PROMPT);
        let summary = match self.call_model(conversation.history(), cancel).await {
            Ok(response) => {
                tally(usage, &response);
                summary_text(&response.content)
            }
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                warn!(error = %e, "Turn limit summary failed");
                format!("No summary available: {e}")
            }
        };
        conversation.append_assistant(summary.clone());

        Ok(format!("[Turn limit of {max_turns} reached]\n{summary}"))
    }

    /// Tokens the context block adds to the user message, separator included.
    fn context_cost(&self, context: &str) -> usize {
        if context.is_empty() {
            0
        } else {
            self.tokens.count(CONTEXT_SEPARATOR) + self.tokens.count(context)
        }
    }

    /// Bring the request within the hard limit, or condense it when it sits
    /// above the condensation trigger. Condensation runs at most once.
    async fn fit_budget(
        &self,
        assembler: &ContextAssembler,
        context: String,
        size: &mut RequestSize,
        cancel: &CancellationToken,
        progress: &Progress,
        usage: &mut Option<Usage>,
    ) -> Result<String, Error> {
        if context.is_empty() {
            if self.tokens.status(size.total()) == BudgetStatus::Exceeded {
                progress.emit(ProgressEvent::Warning {
                    message: format!(
                        "Message alone is {} tokens, over the limit of {}",
                        size.total(),
                        self.tokens.max_tokens()
                    ),
                });
            }
            return Ok(context);
        }

        match self.tokens.status(size.total()) {
            BudgetStatus::Exceeded => {
                let before = size.total();
                let fitted = self.truncate_context(assembler, &context, size);
                size.context = self.context_cost(&fitted);
                warn!(before, after = size.total(), "Context truncated to fit the token limit");
                progress.emit(ProgressEvent::Warning {
                    message: format!(
                        "Context truncated from {before} to {} tokens to fit the limit of {}",
                        size.total(),
                        self.tokens.max_tokens()
                    ),
                });
                Ok(fitted)
            }
            _ if self.options.condense_context
                && size.total() > self.tokens.condensation_trigger() =>
            {
                let condensed = self.condense(&context, cancel, progress, usage).await?;
                if let Some(summary) = condensed {
                    size.context = self.context_cost(&summary);
                    return Ok(summary);
                }
                Ok(context)
            }
            BudgetStatus::Approaching => {
                progress.emit(ProgressEvent::Warning {
                    message: format!(
                        "Request is {} of {} tokens",
                        size.total(),
                        self.tokens.max_tokens()
                    ),
                });
                Ok(context)
            }
            _ => Ok(context),
        }
    }

    /// Drop low-priority sections first; cut by characters only if the
    /// window alone still does not fit.
    fn truncate_context(
        &self,
        assembler: &ContextAssembler,
        context: &str,
        size: &RequestSize,
    ) -> String {
        let allowed = self
            .tokens
            .max_tokens()
            .saturating_sub(size.system + size.user + self.tokens.count(CONTEXT_SEPARATOR));
        if allowed == 0 {
            return String::new();
        }

        let window = assembler.attachment_within(allowed);
        let candidate = if window.is_empty() { context } else { window.as_str() };
        if self.tokens.count(candidate) <= allowed {
            return candidate.to_string();
        }

        let marker = self.tokens.count(HARD_CUT_MARKER);
        if allowed <= marker {
            return String::new();
        }
        let mut cut = self.tokens.truncate_to_tokens(candidate, allowed - marker);
        cut.push_str(HARD_CUT_MARKER);
        cut
    }

    /// One summarization call. `Ok(None)` keeps the original block.
    async fn condense(
        &self,
        context: &str,
        cancel: &CancellationToken,
        progress: &Progress,
        usage: &mut Option<Usage>,
    ) -> Result<Option<String>, Error> {
        let original = self.tokens.count(context);
        info!(tokens = original, "Condensing context");

        let messages = vec![Message::system(CONDENSE_PROMPT), Message::user(context)];
        match self.call_model(messages, cancel).await {
            Ok(response) => {
                tally(usage, &response);
                let summary = response.content.trim();
                let condensed = self.tokens.count(summary);
                if summary.is_empty() || condensed >= original {
                    progress.emit(ProgressEvent::Warning {
                        message: "Context condensation did not shrink the context; sending it unchanged".into(),
                    });
                    return Ok(None);
                }
                info!(before = original, after = condensed, "Context condensed");
                Ok(Some(summary.to_string()))
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                warn!(error = %e, "Context condensation failed, continuing without it");
                progress.emit(ProgressEvent::Warning {
                    message: format!("Context condensation failed: {e}"),
                });
                Ok(None)
            }
        }
    }

    /// Send `messages`, racing the call against cancellation.
    async fn call_model(
        &self,
        messages: Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, Error> {
        let mut request = ProviderRequest::new(self.options.model.clone(), messages);
        request.temperature = self.options.temperature;
        request.max_tokens = self.options.max_response_tokens;
        request.timeout_secs = Some(self.tokens.budget().request_timeout.as_secs());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Cancelled during model call");
                Err(Error::Cancelled)
            }
            result = self.provider.complete(request) => Ok(result?),
        }
    }
}

/// The text `chat` returns for a failed request.
fn failure_text(error: &Error) -> String {
    if error.is_cancelled() {
        CANCELLED_MESSAGE.to_string()
    } else {
        format!("Error: {error}")
    }
}

/// Give a request that ended early an assistant turn, so the next user
/// message does not follow a user message or a tool result.
fn close_interrupted(conversation: &mut Conversation, start: usize, text: &str) {
    let grew = conversation.len() > start;
    if grew && conversation.last().is_some_and(|m| m.role != Role::Assistant) {
        conversation.append_assistant(text);
    }
}

fn tally(total: &mut Option<Usage>, response: &ProviderResponse) {
    if let Some(u) = &response.usage {
        total.get_or_insert_with(Usage::default).accumulate(u);
    }
}

fn summary_text(raw: &str) -> String {
    match interpreter::parse(raw) {
        ModelReply::Empty => "No summary available.".to_string(),
        ModelReply::Text(text) => text,
        reply @ ModelReply::Structured { .. } => {
            let text = reply.text();
            if text.trim().is_empty() {
                raw.to_string()
            } else {
                text.to_string()
            }
        }
    }
}
