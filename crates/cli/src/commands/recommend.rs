//! `sevasaathi recommend` — Suggest schemes from a profile.

use sevasaathi_catalog::{Profile, Recommendation, recommend, recommend_top};
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    keywords: Vec<String>,
    categories: Vec<String>,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = Profile::new(&keywords, &categories);
    if profile.is_empty() {
        return Err("Give at least one --keyword or --category.".into());
    }

    let config = super::load_config(config_path)?;
    let catalog = super::load_catalog(&config)?;

    let results = match limit {
        Some(n) => recommend_top(&profile, &catalog, n),
        None => recommend(&profile, &catalog),
    };
    print!("{}", format_recommendations(&results));
    Ok(())
}

fn format_recommendations(results: &[Recommendation<'_>]) -> String {
    if results.is_empty() {
        return "  No scheme matches this profile.\n".to_string();
    }
    let mut out = String::new();
    for (rank, r) in results.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {} ({}) score {}\n",
            rank + 1,
            r.record.name,
            r.record.category,
            r.score
        ));
    }
    out
}
