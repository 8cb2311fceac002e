//! Turns ranked schemes and recent turns into a `Prompt`.
//!
//! Each matched scheme is rendered as a block bounded by `max_record_chars`
//! (counted in Unicode scalar values). The header (name, category) and the
//! description are always kept; optional sections are filled in priority
//! order and the first one that does not fit is cut short, dropping every
//! section after it:
//!
//! | Priority | Section |
//! |----------|---------|
//! | 1 | Target audience |
//! | 2 | Eligibility |
//! | 3 | Benefits |
//! | 4 | Official website |
//! | 5 | Application process |
//! | 6 | Documents required |
//!
//! Building is pure: identical inputs always give an identical prompt.

use crate::context::token;
use sevasaathi_catalog::MatchResult;
use sevasaathi_core::message::{ConversationHistory, Role};
use sevasaathi_core::prompt::{Prompt, PromptTurn, RenderedRecord};
use sevasaathi_core::SchemeRecord;
use tracing::debug;

/// Fixed role and grounding rules sent with every prompt.
pub const SYSTEM_INSTRUCTION: &str = "\
You are SevaSaathi, a helpful assistant for Indian government schemes and programs.

Guidelines:
1. Answer only from the scheme records provided below. Never invent schemes, amounts, dates or links.
2. If no scheme records are provided, say clearly that no matching scheme was found, and suggest rephrasing the question or browsing by category.
3. Mention specific scheme names, eligibility criteria and benefits when relevant.
4. Describe application processes and required documents when asked.
5. If the records do not contain the requested detail, say so clearly.
6. Keep the answer clear and easy to read, using bullet points or numbered lists when appropriate.";

/// Header of the record context section.
pub const RECORDS_HEADER: &str = "[Matching Schemes]";

/// Record context used when nothing matched.
pub const NO_MATCH_NOTICE: &str =
    "No matching scheme found in the catalog for this question. Tell the user so; do not suggest schemes that are not listed.";

const ELLIPSIS: char = '…';

/// Size bounds for one prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    /// Prior turns carried into the prompt, not counting the question.
    pub max_history_turns: usize,
    /// Upper bound on one rendered scheme, in characters.
    pub max_record_chars: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_history_turns: 6,
            max_record_chars: 1200,
        }
    }
}

/// The context builder. Stateless apart from its limits; create once and reuse.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    limits: ContextLimits,
}

impl ContextBuilder {
    pub fn new(limits: ContextLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ContextLimits {
        self.limits
    }

    /// Assemble the prompt for the newest turn of `history`.
    ///
    /// When the newest turn is a user turn it becomes `Prompt::question`;
    /// the `max_history_turns` turns before it form the history window.
    pub fn build(&self, matches: &[MatchResult<'_>], history: &ConversationHistory) -> Prompt {
        let (record_context, records) = self.render_records(matches);
        let (history_window, question) = self.history_window(history);

        let mut prompt = Prompt {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            record_context,
            records,
            history: history_window,
            question,
            no_match: matches.is_empty(),
            estimated_tokens: 0,
        };
        prompt.estimated_tokens = token::estimate_prompt_tokens(&prompt);

        debug!(
            records = prompt.records.len(),
            truncated = prompt.records.iter().filter(|r| r.truncated).count(),
            history_turns = prompt.history.len(),
            no_match = prompt.no_match,
            estimated_tokens = prompt.estimated_tokens,
            "Prompt built"
        );
        prompt
    }

    fn render_records(&self, matches: &[MatchResult<'_>]) -> (String, Vec<RenderedRecord>) {
        if matches.is_empty() {
            return (format!("{RECORDS_HEADER}\n{NO_MATCH_NOTICE}"), Vec::new());
        }

        let mut blocks = Vec::with_capacity(matches.len());
        let mut records = Vec::with_capacity(matches.len());
        for m in matches {
            let (block, truncated) = render_record(m.record, self.limits.max_record_chars);
            records.push(RenderedRecord {
                name: m.record.name.clone(),
                chars: block.chars().count(),
                truncated,
            });
            blocks.push(block);
        }

        (format!("{RECORDS_HEADER}\n{}", blocks.join("\n")), records)
    }

    fn history_window(&self, history: &ConversationHistory) -> (Vec<PromptTurn>, Option<String>) {
        let turns = history.turns();
        let (earlier, question) = match turns.split_last() {
            Some((last, rest)) if last.role == Role::User => (rest, Some(last.text.clone())),
            _ => (turns, None),
        };

        let start = earlier.len().saturating_sub(self.limits.max_history_turns);
        let window = earlier[start..]
            .iter()
            .map(|t| PromptTurn {
                role: t.role,
                text: t.text.clone(),
            })
            .collect();
        (window, question)
    }
}

/// One optional part of a record block: a header line plus bullet items.
struct Section {
    header: String,
    items: Vec<String>,
}

impl Section {
    fn list(label: &str, items: &[String]) -> Option<Self> {
        (!items.is_empty()).then(|| Self {
            header: format!("{label}:\n"),
            items: items.iter().map(|i| format!("- {i}\n")).collect(),
        })
    }

    fn line(label: &str, value: &str) -> Option<Self> {
        (!value.is_empty()).then(|| Self {
            header: format!("{label}: {value}\n"),
            items: Vec::new(),
        })
    }

    fn chars(&self) -> usize {
        self.header.chars().count() + self.items.iter().map(|i| i.chars().count()).sum::<usize>()
    }
}

/// Optional sections, highest priority first.
fn sections(record: &SchemeRecord) -> Vec<Section> {
    [
        Section::list("Target audience", &record.target_audience),
        Section::list("Eligibility", &record.eligibility),
        Section::list("Benefits", &record.benefits),
        Section::line("Official website", &record.official_website),
        Section::list("Application process", &record.application_process),
        Section::list("Documents required", &record.documents_required),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Render one record in at most `max_chars` characters.
///
/// Returns the block and whether anything was shortened or left out.
fn render_record(record: &SchemeRecord, max_chars: usize) -> (String, bool) {
    let header = format!("### {}\nCategory: {}\n", record.name, record.category);
    let header_chars = header.chars().count();
    if header_chars > max_chars {
        return (clip(&header, max_chars), true);
    }

    let mut out = header;
    let mut remaining = max_chars - header_chars;

    if !record.description.is_empty() {
        let line = format!("Description: {}\n", record.description);
        let line_chars = line.chars().count();
        if line_chars <= remaining {
            out.push_str(&line);
            remaining -= line_chars;
        } else {
            // Clip the description and give up on every optional section.
            let prefix = "Description: ";
            let fixed = prefix.chars().count() + 1;
            if remaining > fixed {
                let body = clip(&record.description, remaining - fixed);
                out.push_str(prefix);
                out.push_str(&body);
                out.push('\n');
            }
            return (out, true);
        }
    }

    let mut truncated = false;
    for section in sections(record) {
        if truncated {
            break;
        }
        let section_chars = section.chars();
        if section_chars <= remaining {
            out.push_str(&section.header);
            for item in &section.items {
                out.push_str(item);
            }
            remaining -= section_chars;
            continue;
        }

        truncated = true;
        let header_chars = section.header.chars().count();
        if section.items.is_empty() || header_chars >= remaining {
            continue;
        }
        let mut budget = remaining - header_chars;
        let mut kept = Vec::new();
        for item in &section.items {
            let n = item.chars().count();
            if n > budget {
                break;
            }
            budget -= n;
            kept.push(item.as_str());
        }
        if !kept.is_empty() {
            out.push_str(&section.header);
            for item in kept {
                out.push_str(item);
            }
        }
    }

    (out, truncated)
}

/// First `max_chars` characters of `text`, ending in an ellipsis when shortened.
fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut clipped: String = text.chars().take(max_chars - 1).collect();
    clipped.push(ELLIPSIS);
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use sevasaathi_core::message::ChatTurn;
    use std::collections::BTreeSet;

    fn full_record() -> SchemeRecord {
        let mut r = SchemeRecord::new("Crop Insurance Scheme", "Agriculture")
            .with_description("Insurance cover against crop loss.")
            .with_eligibility(&["Farmers growing notified crops", "Sharecroppers"])
            .with_benefits(&["Low premium", "Quick claim settlement"]);
        r.target_audience = vec!["Farmers".into()];
        r.official_website = "https://pmfby.gov.in".into();
        r.application_process = vec!["Visit a bank branch".into(), "Fill the form".into()];
        r.documents_required = vec!["Aadhaar card".into(), "Land records".into()];
        r
    }

    fn matched(record: &SchemeRecord) -> MatchResult<'_> {
        MatchResult { record, score: 3.0 }
    }

    fn history_of(texts: &[(Role, &str)]) -> ConversationHistory {
        let mut history = ConversationHistory::new();
        for (role, text) in texts {
            let turn = match role {
                Role::User => ChatTurn::user(*text),
                Role::Assistant => ChatTurn::assistant(*text, BTreeSet::new()),
            };
            history.push(turn);
        }
        history
    }

    #[test]
    fn full_record_renders_every_section_in_order() {
        let (block, truncated) = render_record(&full_record(), 10_000);
        assert!(!truncated);
        let order = [
            "### Crop Insurance Scheme",
            "Category: Agriculture",
            "Description:",
            "Target audience:",
            "Eligibility:",
            "Benefits:",
            "Official website: https://pmfby.gov.in",
            "Application process:",
            "Documents required:",
        ];
        let positions: Vec<usize> = order.iter().map(|s| block.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn record_never_exceeds_bound() {
        let record = full_record();
        for max in [1, 10, 40, 60, 80, 120, 160, 200, 260, 1000] {
            let (block, _) = render_record(&record, max);
            assert!(block.chars().count() <= max, "max={max} got {}", block.chars().count());
        }
    }

    #[test]
    fn low_priority_sections_go_first() {
        let record = full_record();
        let (full, _) = render_record(&record, 10_000);
        let without_docs = full.chars().count() - "- Land records\n".len();

        let (block, truncated) = render_record(&record, without_docs);
        assert!(truncated);
        assert!(block.contains("- Aadhaar card"));
        assert!(!block.contains("Land records"));
        assert!(block.contains("Application process:"));
    }

    #[test]
    fn cut_section_drops_everything_after_it() {
        let record = full_record();
        let (full, _) = render_record(&record, 10_000);
        let upto_eligibility_first = full.find("- Sharecroppers").unwrap();

        let (block, truncated) = render_record(&record, upto_eligibility_first);
        assert!(truncated);
        assert!(block.contains("- Farmers growing notified crops"));
        assert!(!block.contains("Sharecroppers"));
        assert!(!block.contains("Benefits:"));
        assert!(!block.contains("Official website"));
        assert!(!block.contains("Documents required"));
    }

    #[test]
    fn header_and_description_kept_while_sections_remain() {
        let record = full_record();
        let (block, truncated) = render_record(&record, 100);
        assert!(truncated);
        assert!(block.starts_with("### Crop Insurance Scheme\nCategory: Agriculture\n"));
        assert!(block.contains("Description: Insurance cover against crop loss."));
    }

    #[test]
    fn description_clipped_when_header_and_description_overflow() {
        let record = SchemeRecord::new("A", "B").with_description("x".repeat(500));
        let (block, truncated) = render_record(&record, 60);
        assert!(truncated);
        assert!(block.starts_with("### A\nCategory: B\nDescription: x"));
        assert!(block.ends_with("…\n"));
        assert_eq!(block.chars().count(), 60);
    }

    #[test]
    fn header_clipped_as_last_resort() {
        let record = SchemeRecord::new("Pradhan Mantri Awas Yojana", "Housing");
        let (block, truncated) = render_record(&record, 12);
        assert!(truncated);
        assert_eq!(block.chars().count(), 12);
        assert!(block.ends_with('…'));
    }

    #[test]
    fn multibyte_text_counted_in_chars() {
        let record = SchemeRecord::new("योजना", "कृषि").with_description("किसानों के लिए बीमा");
        let (block, truncated) = render_record(&record, 200);
        assert!(!truncated);
        assert!(block.chars().count() < block.len());
    }

    #[test]
    fn empty_matches_give_no_match_framing() {
        let builder = ContextBuilder::default();
        let history = history_of(&[(Role::User, "xyzabc123")]);
        let prompt = builder.build(&[], &history);

        assert!(prompt.no_match);
        assert!(prompt.records.is_empty());
        assert!(prompt.record_context.contains("No matching scheme found"));
        assert!(prompt.system_instruction.contains("no matching scheme was found"));
        assert_eq!(prompt.question.as_deref(), Some("xyzabc123"));
    }

    #[test]
    fn records_rendered_in_rank_order() {
        let a = SchemeRecord::new("Scheme A", "X");
        let b = SchemeRecord::new("Scheme B", "Y");
        let builder = ContextBuilder::default();
        let prompt = builder.build(&[matched(&b), matched(&a)], &history_of(&[]));

        assert_eq!(prompt.record_names(), vec!["Scheme B", "Scheme A"]);
        let pos_b = prompt.record_context.find("### Scheme B").unwrap();
        let pos_a = prompt.record_context.find("### Scheme A").unwrap();
        assert!(pos_b < pos_a);
        assert!(!prompt.no_match);
        assert!(prompt.question.is_none());
    }

    #[test]
    fn rendered_record_stats_reported() {
        let record = full_record();
        let builder = ContextBuilder::new(ContextLimits {
            max_history_turns: 6,
            max_record_chars: 120,
        });
        let prompt = builder.build(&[matched(&record)], &history_of(&[]));
        assert!(prompt.records[0].truncated);
        assert!(prompt.records[0].chars <= 120);
        assert!(prompt.estimated_tokens > 0);
    }

    #[test]
    fn history_window_excludes_question_and_keeps_order() {
        let history = history_of(&[
            (Role::User, "q1"),
            (Role::Assistant, "a1"),
            (Role::User, "q2"),
            (Role::Assistant, "a2"),
            (Role::User, "q3"),
        ]);
        let builder = ContextBuilder::new(ContextLimits {
            max_history_turns: 3,
            max_record_chars: 1200,
        });
        let prompt = builder.build(&[], &history);

        let texts: Vec<&str> = prompt.history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a1", "q2", "a2"]);
        assert_eq!(prompt.question.as_deref(), Some("q3"));
        assert_eq!(prompt.conversation().len(), 4);
    }

    #[test]
    fn zero_history_turns_keeps_only_question() {
        let history = history_of(&[(Role::User, "q1"), (Role::Assistant, "a1"), (Role::User, "q2")]);
        let builder = ContextBuilder::new(ContextLimits {
            max_history_turns: 0,
            max_record_chars: 1200,
        });
        let prompt = builder.build(&[], &history);
        assert!(prompt.history.is_empty());
        assert_eq!(prompt.question.as_deref(), Some("q2"));
    }

    #[test]
    fn deterministic_build() {
        let record = full_record();
        let history = history_of(&[(Role::User, "crop insurance")]);
        let builder = ContextBuilder::default();
        let a = builder.build(&[matched(&record)], &history);
        let b = builder.build(&[matched(&record)], &history);
        assert_eq!(a.system_text(), b.system_text());
        assert_eq!(a.conversation(), b.conversation());
    }
}
