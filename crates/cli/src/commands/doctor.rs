//! `fieldnote doctor`: Diagnose configuration health.

use fieldnote_config::{AppConfig, EndpointConfig};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 fieldnote Doctor — System Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — run `fieldnote onboard` (using defaults)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 blocking issue found.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ LLM API key configured ({})", config.default_provider);
    } else {
        println!("  ⚠️  No LLM API key — summarizer and planner disabled");
        issues += 1;
    }

    let agents = &config.agents;
    for (name, endpoint) in [("weather", &agents.weather), ("news", &agents.news)] {
        issues += check_endpoint_key(name, endpoint);
    }

    let reports_dir = &config.report.reports_dir;
    if reports_dir.is_dir() {
        println!("  ✅ Reports directory exists: {}", reports_dir.display());
    } else if config.report.save {
        println!(
            "  ⚠️  Reports directory missing (created on first save): {}",
            reports_dir.display()
        );
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Returns the number of issues found for one keyed endpoint.
fn check_endpoint_key(name: &str, endpoint: &EndpointConfig) -> usize {
    if !endpoint.enabled {
        println!("  ○  {name} agent disabled");
        return 0;
    }
    match (&endpoint.api_key_env, endpoint.api_key()) {
        (Some(env), None) => {
            println!("  ⚠️  {name} agent: {env} is not set");
            1
        }
        (Some(env), Some(_)) => {
            println!("  ✅ {name} agent: {env} set");
            0
        }
        (None, _) => 0,
    }
}
