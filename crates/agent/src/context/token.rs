//! Token estimation and budget policy.
//!
//! Uses a character-based heuristic: ~4 characters per token. Every size
//! decision in the agent (window fitting, truncation, condensation) goes
//! through a [`TokenManager`], which is constructed explicitly and handed to
//! whoever needs it.

use std::sync::Arc;
use std::time::Duration;

use localpilot_config::TokenConfig;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up. Counts characters, not
/// bytes, so non-ASCII text is not over-counted.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// A pluggable token counter.
///
/// Implementations must be deterministic and monotonic: appending text never
/// lowers the count.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// The default `ceil(chars / 4)` counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharHeuristic;

impl TokenCounter for CharHeuristic {
    fn count(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// Token limits for a single request.
#[derive(Debug, Clone)]
pub struct TokenBudget {
    /// Hard limit for system prompt + context + user message.
    pub max_tokens: usize,
    /// Fraction of `max_tokens` at which the budget is approaching.
    pub warning_ratio: f32,
    /// Fraction of `max_tokens` above which context is condensed.
    pub condensation_ratio: f32,
    /// Passed through to the model transport.
    pub request_timeout: Duration,
}

impl TokenBudget {
    pub fn from_config(config: &TokenConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            warning_ratio: config.warning_ratio,
            condensation_ratio: config.condensation_ratio,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::from_config(&TokenConfig::default())
    }
}

/// Where a token total sits relative to the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    Ok,
    Approaching,
    Exceeded,
}

/// Counts tokens and applies the budget policy.
#[derive(Clone)]
pub struct TokenManager {
    budget: TokenBudget,
    counter: Arc<dyn TokenCounter>,
}

impl TokenManager {
    /// A manager using the [`CharHeuristic`] counter.
    pub fn new(budget: TokenBudget) -> Self {
        Self {
            budget,
            counter: Arc::new(CharHeuristic),
        }
    }

    /// Replace the token counter.
    pub fn with_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    pub fn count(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    pub fn max_tokens(&self) -> usize {
        self.budget.max_tokens
    }

    /// Computed, never stored.
    pub fn warning_threshold(&self) -> usize {
        scale(self.budget.max_tokens, self.budget.warning_ratio)
    }

    pub fn condensation_trigger(&self) -> usize {
        scale(self.budget.max_tokens, self.budget.condensation_ratio)
    }

    pub fn status(&self, total: usize) -> BudgetStatus {
        if total > self.budget.max_tokens {
            BudgetStatus::Exceeded
        } else if total >= self.warning_threshold() {
            BudgetStatus::Approaching
        } else {
            BudgetStatus::Ok
        }
    }

    /// Approximate character length of `tokens` tokens.
    pub fn chars_for_tokens(&self, tokens: usize) -> usize {
        tokens.saturating_mul(4)
    }

    /// Cut `text` on a character boundary so it counts at most `max` tokens.
    pub fn truncate_to_tokens(&self, text: &str, max: usize) -> String {
        if self.count(text) <= max {
            return text.to_string();
        }

        let mut keep = self.chars_for_tokens(max);
        loop {
            let cut: String = text.chars().take(keep).collect();
            if keep == 0 || self.count(&cut) <= max {
                return cut;
            }
            // Custom counters may be denser than the heuristic.
            keep = keep * 9 / 10;
        }
    }
}

/// `max * ratio`, rounded so `0.9_f32` of 1000 is 900 and not 899.
fn scale(max: usize, ratio: f32) -> usize {
    (max as f64 * f64::from(ratio)).round() as usize
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}
