//! `sevasaathi doctor` — Diagnose system health.

use sevasaathi_catalog::Catalog;
use sevasaathi_config::AppConfig;
use sevasaathi_providers::ModelGateway;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 SevaSaathi Doctor — System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    let config_file = super::config_file(config_path);
    if config_file.exists() {
        println!("  ✅ Config file found: {}", config_file.display());
    } else {
        println!("  ⚠️  No config file at {} — using defaults (run `sevasaathi init`)", config_file.display());
    }

    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ {e}");
            println!("\n  ⚠️  Fix the config before running other checks.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set GEMINI_API_KEY or api_key in config.toml");
        issues += 1;
    }

    if Path::new(&config.data_path).exists() {
        println!("  ✅ Data file found: {}", config.data_path);
        match Catalog::load(&config.data_path) {
            Ok(catalog) => println!(
                "  ✅ Catalog valid: {} schemes in {} categories",
                catalog.len(),
                catalog.categories().len()
            ),
            Err(e) => {
                println!("  ❌ Catalog invalid: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ❌ Data file missing: {}", config.data_path);
        issues += 1;
    }

    issues += check_backend(&config).await;

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Build the configured backend and ping it. Returns the number of issues.
async fn check_backend(config: &AppConfig) -> usize {
    let provider = match sevasaathi_providers::build_from_config(config) {
        Ok(provider) => provider,
        Err(e) => {
            println!("  ⏭️  Skipping backend check: {e}");
            return 0;
        }
    };

    let gateway = ModelGateway::from_config(provider, config);
    match gateway.health_check().await {
        Ok(true) => {
            println!(
                "  ✅ Backend reachable: {} ({})",
                gateway.provider_name(),
                gateway.model()
            );
            0
        }
        Ok(false) => {
            println!("  ❌ Backend {} answered with an error", gateway.provider_name());
            1
        }
        Err(e) => {
            println!("  ❌ Backend {} check failed: {e}", gateway.provider_name());
            1
        }
    }
}
