//! `sevasaathi schemes` and `sevasaathi show` — Browse the catalog.

use sevasaathi_core::SchemeRecord;
use std::path::Path;

pub async fn list(
    config_path: Option<&Path>,
    category: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let catalog = super::load_catalog(&config)?;

    let records: Vec<&SchemeRecord> = match &category {
        Some(c) => catalog.by_category(c),
        None => catalog.all().iter().collect(),
    };

    if records.is_empty() {
        match category {
            Some(c) => println!("  No schemes in category '{c}'."),
            None => println!("  The catalog is empty."),
        }
        return Ok(());
    }

    for record in &records {
        println!("  • {} ({})", record.name, record.category);
    }
    println!("\n  {} scheme(s)", records.len());
    Ok(())
}

pub async fn show(config_path: Option<&Path>, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let catalog = super::load_catalog(&config)?;

    let record = catalog
        .get(name)
        .ok_or_else(|| format!("No scheme named '{name}'. Try `sevasaathi search {name}`."))?;
    print!("{}", format_record(record));
    Ok(())
}

/// Every non-empty field of `record`, one section per field.
fn format_record(record: &SchemeRecord) -> String {
    let mut out = format!("{}\n{}\n", record.name, "=".repeat(record.name.chars().count()));
    out.push_str(&format!("Category: {}\n", record.category));
    if !record.description.is_empty() {
        out.push_str(&format!("\n{}\n", record.description));
    }

    let sections: [(&str, &[String]); 5] = [
        ("Target audience", record.target_audience.as_slice()),
        ("Eligibility", record.eligibility.as_slice()),
        ("Benefits", record.benefits.as_slice()),
        ("How to apply", record.application_process.as_slice()),
        ("Documents required", record.documents_required.as_slice()),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{title}:\n"));
        for item in items {
            out.push_str(&format!("  - {item}\n"));
        }
    }

    if !record.official_website.is_empty() {
        out.push_str(&format!("\nWebsite: {}\n", record.official_website));
    }
    out
}
