//! Profile-based recommendations.
//!
//! A profile is a set of free-form keywords ("farmer", "student", "women")
//! plus the categories the user cares about. Each `target_audience` entry
//! containing a keyword adds 2; a category of interest adds 3. Unlike the
//! query matcher, keywords match as substrings, so "farmer" finds
//! "Tenant farmers".

use crate::store::Catalog;
use sevasaathi_core::SchemeRecord;
use tracing::debug;

/// Points for each target-audience entry that mentions a profile keyword.
pub const AUDIENCE_POINTS: u32 = 2;
/// Points for a scheme in one of the profile's categories.
pub const CATEGORY_POINTS: u32 = 3;
/// How many recommendations `recommend` returns.
pub const DEFAULT_LIMIT: usize = 5;

/// What the user told us about themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// Lowercased, trimmed, non-empty keywords.
    keywords: Vec<String>,
    /// Lowercased, trimmed, non-empty category labels.
    categories: Vec<String>,
}

impl Profile {
    pub fn new<K, C>(keywords: K, categories: C) -> Self
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self {
            keywords: normalize(keywords),
            categories: normalize(categories),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.categories.is_empty()
    }
}

fn normalize<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.as_ref().trim().to_lowercase();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// A recommended scheme and its profile score.
#[derive(Debug, Clone, Copy)]
pub struct Recommendation<'a> {
    pub record: &'a SchemeRecord,
    pub score: u32,
}

/// The top `DEFAULT_LIMIT` schemes for `profile`.
pub fn recommend<'a>(profile: &Profile, catalog: &'a Catalog) -> Vec<Recommendation<'a>> {
    recommend_top(profile, catalog, DEFAULT_LIMIT)
}

/// At most `limit` schemes for `profile`, best first; ties keep catalog order.
pub fn recommend_top<'a>(
    profile: &Profile,
    catalog: &'a Catalog,
    limit: usize,
) -> Vec<Recommendation<'a>> {
    if profile.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut results: Vec<Recommendation<'a>> = catalog
        .all()
        .iter()
        .map(|record| Recommendation {
            record,
            score: profile_score(profile, record),
        })
        .filter(|r| r.score > 0)
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score));
    let hits = results.len();
    results.truncate(limit);

    debug!(
        keywords = profile.keywords.len(),
        categories = profile.categories.len(),
        hits,
        returned = results.len(),
        "Profile recommendations"
    );
    results
}

fn profile_score(profile: &Profile, record: &SchemeRecord) -> u32 {
    let audience = record
        .target_audience
        .iter()
        .map(|a| a.to_lowercase())
        .filter(|a| profile.keywords.iter().any(|k| a.contains(k.as_str())))
        .count() as u32;

    let category = record.category.trim().to_lowercase();
    let in_category = profile.categories.iter().any(|c| *c == category);

    audience * AUDIENCE_POINTS + if in_category { CATEGORY_POINTS } else { 0 }
}
