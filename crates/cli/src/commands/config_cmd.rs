//! `fieldnote config`: Configuration management commands.

use fieldnote_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if !config.has_api_key() {
                warnings.push("No API key set (set OPENROUTER_API_KEY or OPENAI_API_KEY env var)");
            }
            if config.engine.concurrency > 16 {
                warnings.push("engine.concurrency above 16 may trip API rate limits");
            }
            if !config.report.save {
                warnings.push("report.save is false: reports are only printed");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:        {}", config.default_provider);
            println!("   Model:           {}", config.default_model);
            println!("   Max iterations:  {}", config.engine.max_iterations);
            println!("   Concurrency:     {}", config.engine.concurrency);
            println!("   Reports:         {}", config.report.reports_dir.display());
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", toml::to_string_pretty(&redacted(config))?);
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

/// Replace every secret with a placeholder.
fn redacted(mut config: AppConfig) -> AppConfig {
    const MASK: &str = "***";
    if config.api_key.is_some() {
        config.api_key = Some(MASK.into());
    }
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some(MASK.into());
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldnote_config::ProviderConfig;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains("config.toml"));
    }

    #[test]
    fn show_never_prints_keys() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-or-secret".into());
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-secret".into()),
                api_url: None,
                default_model: None,
            },
        );
        let text = toml::to_string_pretty(&redacted(config)).unwrap();
        assert!(!text.contains("secret"));
        assert!(text.contains("***"));
    }
}
