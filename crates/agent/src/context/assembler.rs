//! Context assembly: turns a task and a set of file references into the
//! context block sent alongside a user message.
//!
//! Two bounds keep every request deterministic in size:
//!
//! 1. **Per file**: content past `max_file_lines` lines is cut and marked.
//! 2. **Per window**: the sliding window over the master context stops at
//!    `max_window_tokens`, truncating the entry that would overflow and
//!    dropping everything after it.
//!
//! Read failures never abort assembly. A failed file is replaced by an
//! inline `<file error: ...>` marker.

use std::sync::Arc;

use localpilot_core::fs::FileReader;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::store::{MasterContext, TASK_DESCRIPTION_KEY, context_key};
use crate::context::token::TokenManager;

/// Appended to a window entry cut to fit the budget.
pub const WINDOW_TRUNCATION_MARKER: &str = "\n[... truncated to fit the context window]\n\n";

/// Appended when the window still exceeds its budget after fitting.
pub const CONTENT_OMITTED_MARKER: &str = "[... additional context omitted]\n";

/// A file reference supplied with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextItem {
    /// Display label
    pub name: String,
    /// Locator passed to the file reader
    pub path: String,
}

impl ContextItem {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// An item labelled with the file name portion of `path`.
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = std::path::Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        Self { name, path }
    }
}

/// Builds context blocks and owns the session's master context.
pub struct ContextAssembler {
    reader: Arc<dyn FileReader>,
    tokens: Arc<TokenManager>,
    max_file_lines: usize,
    max_window_tokens: usize,
    master: MasterContext,
}

impl ContextAssembler {
    pub fn new(reader: Arc<dyn FileReader>, tokens: Arc<TokenManager>) -> Self {
        Self {
            reader,
            tokens,
            max_file_lines: 256,
            max_window_tokens: 256_000,
            master: MasterContext::new(),
        }
    }

    pub fn with_max_file_lines(mut self, lines: usize) -> Self {
        self.max_file_lines = lines.max(1);
        self
    }

    pub fn with_max_window_tokens(mut self, tokens: usize) -> Self {
        self.max_window_tokens = tokens;
        self
    }

    pub fn max_window_tokens(&self) -> usize {
        self.max_window_tokens
    }

    /// Read `path` and cap it at the line limit, or render the error marker.
    async fn load(&self, path: &str) -> String {
        match self.reader.read(path).await {
            Ok(content) => truncate_lines(&content, self.max_file_lines),
            Err(e) => {
                warn!(path = %path, error = %e, "Context file could not be read");
                format!("<file error: {e}>")
            }
        }
    }

    /// Inline context block for `items`, one section per file in input order.
    pub async fn resolve_context(&self, items: &[ContextItem]) -> String {
        let mut out = String::new();
        for item in items {
            let content = self.load(&item.path).await;
            out.push_str(&format!(
                "File: {} ({})\n```\n{}\n```\n\n",
                item.name, item.path, content
            ));
        }
        out
    }

    /// Record the task and each item in the master context, then return the
    /// sliding window over it.
    pub async fn get_context_for_task(&mut self, task: &str, items: &[ContextItem]) -> String {
        self.record_task(task, items).await;
        self.generate_sliding_window()
    }

    /// Store the task and the current content of each item in the master
    /// context.
    pub async fn record_task(&mut self, task: &str, items: &[ContextItem]) {
        self.master.insert(TASK_DESCRIPTION_KEY, task);
        for item in items {
            let content = self.load(&item.path).await;
            self.master.insert(context_key(&item.path), content);
        }
        debug!(
            items = items.len(),
            entries = self.master.len(),
            "Master context updated"
        );
    }

    /// The priority-ordered view of the master context that fits
    /// `max_window_tokens`.
    pub fn generate_sliding_window(&self) -> String {
        self.window_within(self.max_window_tokens)
    }

    /// The sliding window for an explicit token budget.
    pub fn window_within(&self, budget: usize) -> String {
        self.fit_sections(budget, true)
    }

    /// The window attached after a user message. The task section is left
    /// out because the message itself already carries it.
    pub fn attachment_within(&self, budget: usize) -> String {
        self.fit_sections(budget, false)
    }

    fn fit_sections(&self, budget: usize, include_task: bool) -> String {
        let mut out = String::new();
        let mut used = 0usize;

        for (key, value) in self.master.prioritized() {
            if !include_task && key == TASK_DESCRIPTION_KEY {
                continue;
            }
            let header = section_header(key);
            let section = format!("{header}{value}\n\n");
            let cost = self.tokens.count(&section);

            if used + cost <= budget {
                out.push_str(&section);
                used += cost;
                continue;
            }

            let remaining = budget - used;
            let overhead =
                self.tokens.count(&header) + self.tokens.count(WINDOW_TRUNCATION_MARKER);
            if remaining > overhead {
                let body = self.tokens.truncate_to_tokens(value, remaining - overhead);
                out.push_str(&header);
                out.push_str(&body);
                out.push_str(WINDOW_TRUNCATION_MARKER);
            }
            debug!(key = %key, remaining, "Sliding window full");
            break;
        }

        if self.tokens.count(&out) > budget {
            out.push_str(CONTENT_OMITTED_MARKER);
        }
        out
    }

    pub fn master(&self) -> &MasterContext {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut MasterContext {
        &mut self.master
    }

    pub fn add_to_master(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.master.insert(key, value);
    }

    pub fn get_from_master(&self, key: &str) -> Option<&str> {
        self.master.get(key)
    }

    pub fn remove_from_master(&mut self, key: &str) -> Option<String> {
        self.master.remove(key)
    }

    pub fn clear_master(&mut self) {
        self.master.clear();
    }
}

fn section_header(key: &str) -> String {
    if key == TASK_DESCRIPTION_KEY {
        "## Task\n".to_string()
    } else if let Some(path) = key.strip_prefix(crate::context::store::CONTEXT_KEY_PREFIX) {
        format!("## File: {path}\n")
    } else {
        format!("## {key}\n")
    }
}

/// Keep the first `max` lines, marking how many were cut.
pub fn truncate_lines(content: &str, max: usize) -> String {
    let total = content.lines().count();
    if total <= max {
        return content.to_string();
    }
    let kept: Vec<&str> = content.lines().take(max).collect();
    format!(
        "{}\n[... truncated: {} more lines]",
        kept.join("\n"),
        total - max
    )
}
