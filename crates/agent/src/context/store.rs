//! The master context store: everything the agent has been given or has
//! read during a session, keyed and kept in insertion order.

/// Key holding the task description of the most recent request.
pub const TASK_DESCRIPTION_KEY: &str = "task_description";

/// Prefix of per-file keys.
pub const CONTEXT_KEY_PREFIX: &str = "context_";

/// The store key for a file path.
pub fn context_key(path: &str) -> String {
    format!("{CONTEXT_KEY_PREFIX}{path}")
}

/// An insertion-ordered key to text map.
///
/// Overwriting a key replaces its value in place, so a file keeps its
/// position when it is re-read.
#[derive(Debug, Clone, Default)]
pub struct MasterContext {
    entries: Vec<(String, String)>,
}

impl MasterContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Last write wins.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in window priority order: the task description, then file
    /// entries, then everything else. Insertion order is kept within a group.
    pub fn prioritized(&self) -> Vec<(&str, &str)> {
        let rank = |key: &str| {
            if key == TASK_DESCRIPTION_KEY {
                0
            } else if key.starts_with(CONTEXT_KEY_PREFIX) {
                1
            } else {
                2
            }
        };

        let mut ordered: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        // Stable sort keeps insertion order inside each group.
        ordered.sort_by_key(|(k, _)| rank(k));
        ordered
    }
}
