//! `fieldnote agents`: List registered agents.

use fieldnote_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let router = fieldnote_providers::build_from_config(&config);
    let registry = fieldnote_agents::default_registry(&config, router.default());

    println!("🧩 Registered agents ({}):\n", registry.len());
    for (name, registration) in registry.iter() {
        println!("  {name:<20} {}", registration.agent.description());
        println!("  {:<20} merge: {}", "", registration.strategy.describe());
    }

    if !registry.contains("summarizer") {
        println!("\n  ⚠️  summarizer unavailable: no LLM provider configured");
    }

    Ok(())
}
