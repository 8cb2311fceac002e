//! Prompt construction.
//!
//! Ranked schemes are rendered under a per-record character bound, and the
//! conversation is cut to a window of recent turns.

pub mod builder;
pub mod token;

pub use builder::{ContextBuilder, ContextLimits, NO_MATCH_NOTICE, RECORDS_HEADER, SYSTEM_INSTRUCTION};
pub use token::{estimate_prompt_tokens, estimate_tokens};
