//! `sevasaathi stats` — Catalog statistics.

use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let catalog = super::load_catalog(&config)?;
    let counts = catalog.category_counts();

    println!("SevaSaathi Catalog");
    println!("==================");
    println!("  Data file:   {}", config.data_path);
    println!("  Schemes:     {}", catalog.len());
    println!("  Categories:  {}", counts.len());
    println!();
    for (category, count) in counts {
        println!("  {category:<20} {count:>4}");
    }
    Ok(())
}
