//! File reading capability used by context assembly.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::FileError;

/// Reads file content for context assembly.
///
/// Implementations must map a missing file to [`FileError::NotFound`] so
/// callers can render a precise inline marker.
#[async_trait]
pub trait FileReader: Send + Sync {
    /// Read the full text content at `path`.
    async fn read(&self, path: &str) -> Result<String, FileError>;
}

/// A [`FileReader`] backed by the local filesystem.
///
/// Relative paths are resolved against `root` when one is set, otherwise
/// against the process working directory.
#[derive(Debug, Clone, Default)]
pub struct LocalFileReader {
    root: Option<PathBuf>,
}

impl LocalFileReader {
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Resolve relative paths against the given workspace root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        match &self.root {
            Some(root) if p.is_relative() => root.join(p),
            _ => p.to_path_buf(),
        }
    }
}

#[async_trait]
impl FileReader for LocalFileReader {
    async fn read(&self, path: &str) -> Result<String, FileError> {
        let resolved = self.resolve(path);
        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileError::NotFound(path.to_string()))
            }
            Err(e) => Err(FileError::Io {
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
