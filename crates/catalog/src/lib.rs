//! Scheme catalog and query matching for SevaSaathi.
//!
//! - `store` — loads the JSON scheme source once and exposes read-only accessors
//! - `matcher` — weighted lexical scoring of catalog records against a query
//! - `recommend` — ranks schemes against a user profile instead of a query

pub mod matcher;
pub mod recommend;
pub mod store;

pub use matcher::{MatchResult, MatchWeights, match_schemes, tokenize};
pub use recommend::{Profile, Recommendation, recommend, recommend_top};
pub use store::Catalog;
