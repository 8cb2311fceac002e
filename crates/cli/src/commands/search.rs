//! `sevasaathi search` — Rank schemes against a query, no model call.

use sevasaathi_catalog::{MatchWeights, match_schemes};
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    query: &str,
    category: Option<String>,
    top_k: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let catalog = super::load_catalog(&config)?;

    let weights = MatchWeights {
        name: config.retrieval.name_weight,
        category: config.retrieval.category_weight,
        body: config.retrieval.body_weight,
    };
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let matches = match_schemes(query, &catalog, category.as_deref(), top_k, &weights);

    if matches.is_empty() {
        println!("  No matching scheme found.");
        return Ok(());
    }

    for (rank, m) in matches.iter().enumerate() {
        println!(
            "  {:>2}. {:<45} {:<14} score {:.1}",
            rank + 1,
            m.record.name,
            m.record.category,
            m.score
        );
    }
    Ok(())
}
