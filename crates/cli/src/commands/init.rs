//! `sevasaathi init` — First-time setup.

use sevasaathi_config::AppConfig;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = super::config_file(config_path);

    println!("SevaSaathi — First-Time Setup");
    println!("=============================\n");

    if let Some(dir) = config_path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created config directory: {}", dir.display());
        } else {
            println!("  Config directory exists: {}", dir.display());
        }
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Add your Gemini API key to {}", config_path.display());
    println!("      (or export GEMINI_API_KEY)");
    println!("   2. Point data_path at your scheme_data.json");
    println!("   3. Run: sevasaathi doctor");
    println!("   4. Run: sevasaathi chat\n");

    Ok(())
}
