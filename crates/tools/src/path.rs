//! Workspace path scoping for the file tools.
//!
//! Every path a tool touches is resolved against the workspace root and must
//! stay inside it. The check is lexical so it also covers files that do not
//! exist yet (writes).

use std::path::{Component, Path, PathBuf};

use localpilot_core::error::ToolError;

/// Error returned when a path escapes the workspace.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Path '{path}' is outside the workspace")]
    OutsideWorkspace { path: String },

    #[error("Empty path")]
    Empty,
}

impl PathValidationError {
    /// Convert into the permission error a tool returns.
    pub fn into_tool_error(self, tool_name: &str) -> ToolError {
        ToolError::PermissionDenied {
            tool_name: tool_name.into(),
            reason: self.to_string(),
        }
    }
}

/// The directory all file tools are confined to.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` to an absolute location inside the workspace.
    ///
    /// Relative paths are joined onto the root. Absolute paths are accepted
    /// only when they already lie under it. Any `..` component is rejected.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathValidationError> {
        if path.trim().is_empty() {
            return Err(PathValidationError::Empty);
        }

        let normalized = path.replace('\\', "/");
        let input = Path::new(&normalized);

        if input.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PathValidationError::PathTraversal { path: path.into() });
        }

        if input.is_absolute() {
            if input.starts_with(&self.root) {
                Ok(input.to_path_buf())
            } else {
                Err(PathValidationError::OutsideWorkspace { path: path.into() })
            }
        } else {
            Ok(self.root.join(input))
        }
    }
}
