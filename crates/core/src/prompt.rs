//! The assembled, backend-neutral payload handed to the model gateway.

use crate::message::Role;
use serde::{Deserialize, Serialize};

/// A single prior turn carried into the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTurn {
    pub role: Role,
    pub text: String,
}

/// Render statistics for one scheme included in the record context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedRecord {
    /// Scheme name.
    pub name: String,
    /// Characters this record occupies in `record_context`.
    pub chars: usize,
    /// Whether any field was shortened or dropped to fit the bound.
    pub truncated: bool,
}

/// Everything the model sees for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Fixed role and grounding rules.
    pub system_instruction: String,

    /// Rendered scheme records (or the no-match notice).
    pub record_context: String,

    /// Per-record render statistics, in rank order.
    pub records: Vec<RenderedRecord>,

    /// Prior turns, oldest first.
    pub history: Vec<PromptTurn>,

    /// The question being answered, if the history ended with one.
    pub question: Option<String>,

    /// True when no scheme matched the question.
    pub no_match: bool,

    /// Rough token estimate of the whole payload.
    pub estimated_tokens: usize,
}

impl Prompt {
    /// System instruction followed by the record context.
    pub fn system_text(&self) -> String {
        if self.record_context.is_empty() {
            self.system_instruction.clone()
        } else {
            format!("{}\n\n{}", self.system_instruction, self.record_context)
        }
    }

    /// History followed by the current question as the final user turn.
    pub fn conversation(&self) -> Vec<PromptTurn> {
        let mut turns = self.history.clone();
        if let Some(question) = &self.question {
            turns.push(PromptTurn {
                role: Role::User,
                text: question.clone(),
            });
        }
        turns
    }

    /// Names of the schemes rendered into the context, in rank order.
    pub fn record_names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }
}
