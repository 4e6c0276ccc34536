//! Backend check command

use anyhow::Result;
use clausewise_core::ai::{AIBackend, AIClient};
use clausewise_core::config::default_config_path;
use clausewise_core::Settings;

/// Print resolved settings and probe the configured backend
pub async fn cmd_check(settings: &Settings) -> Result<()> {
    println!("🔍 Clausewise configuration\n");

    match default_config_path() {
        Some(path) if path.is_file() => println!("  Config file: {}", path.display()),
        Some(path) => println!("  Config file: none ({} not found)", path.display()),
        None => println!("  Config file: none"),
    }
    println!("  Backend: {}", settings.backend.as_str());
    println!("  Render mode: {}", settings.render_mode);
    println!("  Streaming: {}", settings.streams());
    println!("  System prompt: {}", settings.prompt_source().describe());
    println!("  Upload limit: {} MB", settings.max_upload_mb);
    println!("  Request timeout: {}s\n", settings.request_timeout_secs);

    let Some(client) = AIClient::from_settings(settings) else {
        println!("  ⚠️  Gemini backend not configured");
        println!("\nSet GEMINI_API_KEY (or GOOGLE_API_KEY) to enable it,");
        println!("or AI_BACKEND=mock for local testing.");
        return Ok(());
    };

    println!("  Host: {}", client.host());
    println!("  Model: {}", client.model());

    print!("\nChecking backend availability... ");
    if client.health_check().await {
        println!("✅ Connected");
    } else {
        println!("❌ Failed");
        println!("\n⚠️  Could not reach model {} at {}", client.model(), client.host());
        println!("Check the API key, GEMINI_HOST and GEMINI_MODEL.");
    }

    Ok(())
}
