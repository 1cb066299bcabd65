//! Error types for the localpilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each capability (model transport, tools, file access) has its own enum;
//! the top-level [`Error`] wraps them for code that crosses boundaries.

use thiserror::Error;

/// The top-level error type for all localpilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- File errors ---
    #[error("File error: {0}")]
    File(#[from] FileError),

    /// The in-flight request was cancelled by the caller or superseded by a
    /// newer request on the same agent.
    #[error("Request cancelled")]
    Cancelled,
}

impl Error {
    /// Whether this error represents a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// --- Capability errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by model server, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from model server: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 503,
            message: "model loading".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("model loading"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::PermissionDenied {
            tool_name: "run_command".into(),
            reason: "command not in allowlist".into(),
        });
        assert!(err.to_string().contains("run_command"));
        assert!(err.to_string().contains("allowlist"));
    }

    #[test]
    fn cancelled_is_distinguishable() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Provider(ProviderError::Timeout("30s".into())).is_cancelled());
    }

    #[test]
    fn file_error_converts() {
        let err: Error = FileError::NotFound("src/missing.rs".into()).into();
        assert!(matches!(err, Error::File(FileError::NotFound(_))));
        assert!(err.to_string().contains("src/missing.rs"));
    }
}
