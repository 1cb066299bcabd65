//! LLM Provider implementations for localpilot.
//!
//! All providers implement the `localpilot_core::Provider` trait.
//! [`build_from_config`] selects and configures the right one.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
