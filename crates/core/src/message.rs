//! Message and Conversation domain types.
//!
//! A [`Conversation`] is the ordered log the agent sends to the model on every
//! turn. Its first entry is always the system prompt; everything after it is
//! appended through the `append_*` methods, never edited in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::ToolResult;

/// The synthetic user message inserted when history would otherwise end on
/// a plain assistant turn.
pub const CONTINUE_NUDGE: &str = "Continue.";

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The language model
    Assistant,
    /// System instructions (prompt, tool catalog)
    System,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Whether this assistant message carries a structured tool-call payload.
    pub fn looks_like_tool_payload(&self) -> bool {
        self.content.contains("\"tool_calls\"")
    }
}

/// An ordered, append-only message log headed by the system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation containing only the system prompt.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: vec![Message::system(system_prompt)],
            created_at: now,
            updated_at: now,
        }
    }

    fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    pub fn append_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    pub fn append_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// Append a tool result rendered as a status marker plus output or error text.
    pub fn append_tool_result(&mut self, call_id: impl Into<String>, result: &ToolResult) {
        self.push(Message::tool_result(call_id, result.render()));
    }

    /// An ordered copy of the full history, system prompt first.
    pub fn history(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Borrow the messages without copying.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages including the system prompt.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when only the system prompt is present.
    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    /// Truncate back to the system prompt.
    pub fn clear(&mut self) {
        self.messages.truncate(1);
        self.updated_at = Utc::now();
    }

    /// Pre-send normalization.
    ///
    /// When the log ends on a plain assistant message, appends a user
    /// [`CONTINUE_NUDGE`] so the model is not asked to answer its own turn.
    /// A trailing tool result or tool-call payload needs no nudge.
    /// Returns `true` when a nudge was inserted.
    pub fn ensure_role_alternation(&mut self) -> bool {
        match self.messages.last() {
            Some(last) if last.role == Role::Assistant && !last.looks_like_tool_payload() => {
                self.append_user(CONTINUE_NUDGE);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolResult;

    #[test]
    fn new_conversation_starts_with_system() {
        let conv = Conversation::new("You are a coding agent.");
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.messages()[0].role, Role::System);
        assert_eq!(conv.system_prompt(), "You are a coding agent.");
        assert!(conv.is_empty());
    }

    #[test]
    fn append_and_history_preserve_order() {
        let mut conv = Conversation::new("sys");
        conv.append_user("hi");
        conv.append_assistant("hello");
        let roles: Vec<Role> = conv.history().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[test]
    fn clear_keeps_system_prompt() {
        let mut conv = Conversation::new("sys");
        conv.append_user("a");
        conv.append_assistant("b");
        conv.clear();
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.system_prompt(), "sys");
    }

    #[test]
    fn tool_result_is_rendered_with_status() {
        let mut conv = Conversation::new("sys");
        conv.append_tool_result("call_1", &ToolResult::success("call_1", "done"));
        let last = conv.last().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
        assert!(last.content.contains("SUCCESS"));
        assert!(last.content.contains("done"));
    }

    #[test]
    fn nudge_after_plain_assistant() {
        let mut conv = Conversation::new("sys");
        conv.append_user("q");
        conv.append_assistant("an answer");
        assert!(conv.ensure_role_alternation());
        let last = conv.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, CONTINUE_NUDGE);
    }

    #[test]
    fn no_nudge_after_tool_payload_or_tool_result() {
        let mut conv = Conversation::new("sys");
        conv.append_assistant(r#"{"thought":"x","tool_calls":[]}"#);
        assert!(!conv.ensure_role_alternation());

        conv.append_tool_result("1", &ToolResult::error("1", "nope"));
        assert!(!conv.ensure_role_alternation());
        assert_eq!(conv.len(), 3);
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::user("Test message");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"user""#));
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content, "Test message");
        assert_eq!(deserialized.role, Role::User);
    }
}
