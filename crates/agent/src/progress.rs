//! Progress events emitted while a request runs.
//!
//! Observers receive a [`ProgressEvent`] at fixed points: before each model
//! call, after each tool call, once context is assembled, and once the final
//! token tallies are known. Delivery is fire-and-forget; the agent never
//! waits on or reads anything back from the observer.

use std::sync::Arc;

use localpilot_core::provider::Usage;
use serde::{Deserialize, Serialize};

/// Callback invoked synchronously for every event.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Events emitted by the agent during a `chat` call.
///
/// - `thinking`: a model call is about to start
/// - `thought`: the model explained its next step
/// - `tool_start`: a tool is about to run
/// - `tool_end`: a tool finished
/// - `contextAdded`: the context block was assembled
/// - `tokens`: token counts for the request
/// - `warning`: a recoverable problem
/// - `error`: the request failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A model call is starting.
    Thinking { turn: usize },

    /// Reasoning text from a structured reply.
    Thought { content: String },

    ToolStart {
        id: String,
        name: String,
        parameters: serde_json::Value,
    },

    ToolEnd {
        id: String,
        name: String,
        success: bool,
        output: String,
    },

    #[serde(rename = "contextAdded")]
    ContextAdded { items: usize, tokens: usize },

    /// Estimated request size, plus server-reported usage when available.
    Tokens {
        system: usize,
        context: usize,
        user: usize,
        total: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },

    Warning { message: String },

    Error { message: String },
}

impl ProgressEvent {
    /// Wire name of this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Thinking { .. } => "thinking",
            Self::Thought { .. } => "thought",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::ContextAdded { .. } => "contextAdded",
            Self::Tokens { .. } => "tokens",
            Self::Warning { .. } => "warning",
            Self::Error { .. } => "error",
        }
    }
}

/// Optional observer wrapper. Emitting with no observer attached is a no-op.
#[derive(Clone, Default)]
pub(crate) struct Progress {
    callback: Option<ProgressCallback>,
    verbose: bool,
}

impl Progress {
    pub(crate) fn new(callback: Option<ProgressCallback>, verbose: bool) -> Self {
        Self { callback, verbose }
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        if let Some(cb) = &self.callback {
            cb(&event);
        }
    }

    /// Tool output is shortened in `tool_end` events unless verbose.
    pub(crate) fn tool_output(&self, output: &str) -> String {
        const PREVIEW_CHARS: usize = 200;
        if self.verbose || output.chars().count() <= PREVIEW_CHARS {
            return output.to_string();
        }
        let mut preview: String = output.chars().take(PREVIEW_CHARS).collect();
        preview.push_str("...");
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn serialization_uses_type_tag() {
        let json = serde_json::to_string(&ProgressEvent::Thinking { turn: 1 }).unwrap();
        assert!(json.contains(r#""type":"thinking""#));
        assert!(json.contains(r#""turn":1"#));

        let json = serde_json::to_string(&ProgressEvent::ToolEnd {
            id: "1".into(),
            name: "read_file".into(),
            success: true,
            output: "ok".into(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"tool_end""#));
    }

    #[test]
    fn context_added_wire_name() {
        let event = ProgressEvent::ContextAdded {
            items: 2,
            tokens: 40,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"contextAdded""#));
        assert_eq!(event.event_type(), "contextAdded");

        let back: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn tokens_omits_missing_usage() {
        let json = serde_json::to_string(&ProgressEvent::Tokens {
            system: 1,
            context: 2,
            user: 3,
            total: 6,
            usage: None,
        })
        .unwrap();
        assert!(!json.contains("usage"));
    }

    #[test]
    fn emit_without_observer_is_noop() {
        Progress::default().emit(ProgressEvent::Warning {
            message: "x".into(),
        });
    }

    #[test]
    fn emit_reaches_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress = Progress::new(
            Some(Arc::new(move |e: &ProgressEvent| {
                sink.lock().unwrap().push(e.event_type());
            })),
            false,
        );
        progress.emit(ProgressEvent::Thinking { turn: 1 });
        progress.emit(ProgressEvent::Error {
            message: "boom".into(),
        });
        assert_eq!(*seen.lock().unwrap(), vec!["thinking", "error"]);
    }

    #[test]
    fn long_tool_output_is_previewed() {
        let long = "x".repeat(500);
        let quiet = Progress::new(None, false);
        assert_eq!(quiet.tool_output(&long).chars().count(), 203);
        assert_eq!(Progress::new(None, true).tool_output(&long), long);
        assert_eq!(quiet.tool_output("short"), "short");
    }
}
