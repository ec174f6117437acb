//! `fieldnote onboard`: First-time setup.

use fieldnote_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("📓 fieldnote — First-Time Setup");
    println!("===============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let config = AppConfig::load_from(&config_path)?;
    let reports_dir = &config.report.reports_dir;
    if !reports_dir.exists() {
        std::fs::create_dir_all(reports_dir)?;
        println!("✅ Created reports directory: {}", reports_dir.display());
    }

    println!("\n📝 Next steps:");
    println!("   1. Set OPENROUTER_API_KEY (or edit {})", config_path.display());
    println!("   2. Optionally set OPENWEATHER_KEY and NEWSDATA_API_KEY");
    println!("   3. Run: fieldnote research --goal \"weather in Paris\"\n");

    Ok(())
}
