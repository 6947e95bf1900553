//! `pillbox config` — Configuration management commands.

use pillbox_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed successfully");

    let mut warnings = Vec::new();

    if !config.has_api_key() {
        warnings.push("No API key set (set PILLBOX_API_KEY or OPENAI_API_KEY env var)".to_string());
    }

    match super::load_catalog(&config) {
        Ok(catalog) if catalog.medications.is_empty() => {
            warnings.push("Catalog has no medications".to_string());
        }
        Ok(_) => {}
        Err(e) => warnings.push(format!("Catalog unusable: {e}")),
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
    println!("   API URL:   {}", config.api_url);
    println!("   Model:     {}", config.model);
    println!("   Rounds:    {}", config.agent.max_rounds);
    println!(
        "   Results:   keyed by {}",
        if config.agent.key_results_by_call_id { "call id" } else { "tool name" }
    );
    println!(
        "   Prompt:    {}",
        if config.agent.system_prompt_override.is_some() { "custom" } else { "built-in" }
    );
    println!(
        "   Catalog:   {}",
        config.catalog.path.as_deref().unwrap_or("built-in")
    );

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
