//! # localpilot core
//!
//! Domain types, capability traits, and error definitions for the localpilot
//! coding agent. Nothing here talks to a network or a model server; this crate
//! defines the shapes every other crate implements against.
//!
//! ## Capabilities
//!
//! The agent loop consumes three external capabilities, each a trait here:
//! - [`Provider`] sends a message history to a language model
//! - [`ToolGateway`] executes named tools and lists their definitions
//! - [`FileReader`] fetches file content for context assembly

pub mod error;
pub mod fs;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, FileError, ProviderError, ToolError};
pub use fs::{FileReader, LocalFileReader};
pub use message::{Conversation, ConversationId, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{Tool, ToolCall, ToolDefinition, ToolGateway, ToolRegistry, ToolResult, ToolStatus};
