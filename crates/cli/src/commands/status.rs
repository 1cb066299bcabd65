//! `localpilot status`: show the effective configuration.

use localpilot_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("LocalPilot status");
    println!("=================");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!("  Provider:       {}", config.model.provider);
    println!("  Endpoint:       {}", config.model.effective_endpoint());
    println!("  Model:          {}", config.model.name);
    println!("  Temperature:    {}", config.model.temperature);
    println!(
        "  API key:        {}",
        if config.model.api_key.is_some() { "set" } else { "none" }
    );
    println!("  Max tokens:     {}", config.tokens.max_tokens);
    println!("  Timeout:        {}s", config.tokens.request_timeout_secs);
    println!("  Max turns:      {}", config.agent.max_turns);
    println!(
        "  Condensation:   {}",
        if config.agent.condense_context { "enabled" } else { "disabled" }
    );
    println!("  Workspace:      {}", config.tools.effective_root().display());
    if config.tools.allowed_commands.is_empty() {
        println!("  Commands:       any");
    } else {
        println!("  Commands:       {}", config.tools.allowed_commands.join(", "));
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, using defaults. Run `localpilot onboard` to create one.");
    }

    Ok(())
}
