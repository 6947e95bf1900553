//! `pillbox onboard` — First-time setup.

use pillbox_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("💊 pillbox — First-Time Setup");
    println!("=============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set your API key:");
    println!("      export PILLBOX_API_KEY='sk-...'   (or OPENAI_API_KEY)");
    println!("   2. Optionally point [catalog] path at your own catalog TOML");
    println!("   3. Start chatting:");
    println!("      pillbox chat");
    println!();

    Ok(())
}
