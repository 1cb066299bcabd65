//! `localpilot doctor`: diagnose configuration and model server health.

use localpilot_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("LocalPilot doctor");
    println!("=================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  [warn] No config file, using defaults. Run `localpilot onboard`.");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Configuration valid");
            config
        }
        Err(e) => {
            println!("  [fail] Configuration invalid: {e}");
            println!("\n  1 issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    let root = config.tools.effective_root();
    if root.is_dir() {
        println!("  [ok]   Workspace {}", root.display());
    } else {
        println!("  [fail] Workspace {} is not a directory", root.display());
        issues += 1;
    }

    let provider = localpilot_providers::build_from_config(&config);
    let endpoint = config.model.effective_endpoint();
    match provider.health_check().await {
        Ok(true) => {
            println!("  [ok]   Model server reachable at {endpoint}");
            match provider.list_models().await {
                Ok(models) if models.iter().any(|m| *m == config.model.name) => {
                    println!("  [ok]   Model '{}' available", config.model.name);
                }
                Ok(models) if models.is_empty() => {
                    println!("  [warn] Server did not list any models");
                }
                Ok(models) => {
                    println!(
                        "  [fail] Model '{}' not found. Available: {}",
                        config.model.name,
                        models.join(", ")
                    );
                    issues += 1;
                }
                Err(e) => println!("  [warn] Could not list models: {e}"),
            }
        }
        Ok(false) => {
            println!("  [fail] Model server at {endpoint} did not respond");
            issues += 1;
        }
        Err(e) => {
            println!("  [fail] Model server at {endpoint} unreachable: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
