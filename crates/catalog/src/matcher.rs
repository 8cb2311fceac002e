//! Weighted lexical relevance of schemes to a question.
//!
//! Scoring: each distinct query token contributes `name` weight if it is a
//! token of the scheme name, `category` weight if it is a token of the
//! category, and `body` weight if it is a token of the description,
//! eligibility or benefits. Zero-score records are never returned.
//!
//! Pure and deterministic: ties keep catalog order.

use crate::store::Catalog;
use sevasaathi_core::SchemeRecord;
use std::collections::HashSet;
use tracing::debug;

/// Function words that carry no signal about which scheme is meant.
const STOPWORDS: &[&str] = &[
    "a", "about", "am", "an", "and", "any", "are", "as", "at", "be", "by", "can", "do", "for",
    "from", "how", "i", "in", "is", "it", "me", "my", "of", "on", "or", "the", "to", "what",
    "which", "with",
];

/// Per-field weights for the relevance score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchWeights {
    pub name: f32,
    pub category: f32,
    pub body: f32,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            name: 3.0,
            category: 2.0,
            body: 1.0,
        }
    }
}

/// A scheme judged relevant to a query. Borrowed from the catalog.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    pub record: &'a SchemeRecord,
    pub score: f32,
}

/// Lowercase `text` and split it on non-alphanumeric boundaries.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Distinct, non-stopword query tokens in first-seen order.
fn query_tokens(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(query)
        .into_iter()
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn token_set<'s>(fields: impl IntoIterator<Item = &'s str>) -> HashSet<String> {
    fields.into_iter().flat_map(tokenize).collect()
}

fn score_record(tokens: &[String], record: &SchemeRecord, weights: &MatchWeights) -> f32 {
    let name = token_set([record.name.as_str()]);
    let category = token_set([record.category.as_str()]);
    let body = token_set(
        std::iter::once(record.description.as_str())
            .chain(record.eligibility.iter().map(String::as_str))
            .chain(record.benefits.iter().map(String::as_str)),
    );

    tokens.iter().fold(0.0, |score, token| {
        let mut s = score;
        if name.contains(token) {
            s += weights.name;
        }
        if category.contains(token) {
            s += weights.category;
        }
        if body.contains(token) {
            s += weights.body;
        }
        s
    })
}

/// Rank catalog records against `query`.
///
/// Returns at most `top_k` results by descending score. An empty result is
/// the NoMatch outcome, not an error.
pub fn match_schemes<'a>(
    query: &str,
    catalog: &'a Catalog,
    category: Option<&str>,
    top_k: usize,
    weights: &MatchWeights,
) -> Vec<MatchResult<'a>> {
    let tokens = query_tokens(query);
    if tokens.is_empty() || top_k == 0 {
        debug!(query_tokens = tokens.len(), top_k, "Nothing to match");
        return Vec::new();
    }

    let mut results: Vec<MatchResult<'a>> = catalog
        .all()
        .iter()
        .filter(|r| category.is_none_or(|c| r.in_category(c)))
        .map(|record| MatchResult {
            record,
            score: score_record(&tokens, record, weights),
        })
        .filter(|m| m.score > 0.0)
        .collect();

    // Stable sort, so equal scores keep catalog order.
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let hits = results.len();
    results.truncate(top_k);

    debug!(
        tokens = ?tokens,
        category = category.unwrap_or("all"),
        hits,
        returned = results.len(),
        "Query matched"
    );
    results
}
