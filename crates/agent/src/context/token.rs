//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token, rounded up.
//! Only used for logging prompt size; nothing is trimmed by token count.

use sevasaathi_core::prompt::{Prompt, PromptTurn};

/// Per-message overhead for role name and delimiters in the wire format.
const MESSAGE_OVERHEAD: usize = 4;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimate tokens for a single turn including per-message overhead.
pub fn estimate_turn_tokens(turn: &PromptTurn) -> usize {
    MESSAGE_OVERHEAD + estimate_tokens(&turn.text)
}

/// Estimate tokens for a whole prompt: system text plus every turn.
pub fn estimate_prompt_tokens(prompt: &Prompt) -> usize {
    estimate_tokens(&prompt.system_text())
        + prompt
            .conversation()
            .iter()
            .map(estimate_turn_tokens)
            .sum::<usize>()
}
