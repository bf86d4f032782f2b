//! `scenetrack init` — print or write the default configuration.

use scenetrack_config::AppConfig;

pub async fn run(write: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !write {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        tokio::fs::create_dir_all(&config_dir).await?;
        println!("✅ Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.");
    } else {
        tokio::fs::write(&config_path, AppConfig::default_toml()).await?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    // The preset is written out so it can be edited and pointed to with
    // `schema_path`.
    let schema_path = config_dir.join("schema.json");
    if !schema_path.exists() {
        let schema = scenetrack_config::default_schema()?;
        tokio::fs::write(&schema_path, serde_json::to_string_pretty(&schema)?).await?;
        println!("✅ Wrote built-in schema to: {}", schema_path.display());
    }

    Ok(())
}
