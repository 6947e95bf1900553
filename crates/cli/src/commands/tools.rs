//! `pillbox tools` — List the capabilities offered to the model.

use pillbox_config::AppConfig;
use std::sync::Arc;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let catalog = super::load_catalog(&config)?;
    let source = config.catalog.path.as_deref().unwrap_or("built-in");
    let summary = format!(
        "{} medications, {} users",
        catalog.medications.len(),
        catalog.users.len()
    );
    let registry = pillbox_tools::default_registry(Arc::new(catalog))?;

    println!("💊 Pharmacy capabilities");
    println!("   Catalog: {source} ({summary})");
    println!();

    for def in registry.definitions() {
        println!("   {}({})", def.name, signature(&def.parameters));
        println!("      {}", def.description);
    }

    Ok(())
}

/// Render an object schema's properties as `name: type` pairs, marking
/// optional ones with `?`.
fn signature(schema: &serde_json::Value) -> String {
    let required: Vec<&str> = schema["required"]
        .as_array()
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    schema["properties"]
        .as_object()
        .map(|props| {
            props
                .iter()
                .map(|(name, prop)| {
                    let ty = prop["type"].as_str().unwrap_or("any");
                    let marker = if required.contains(&name.as_str()) { "" } else { "?" };
                    format!("{name}{marker}: {ty}")
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}
