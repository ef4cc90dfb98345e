//! `thirdvoice doctor`: Diagnose configuration and cache health.

use thirdvoice_config::AppConfig;
use thirdvoice_core::CacheStore;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Third Voice Doctor: System Diagnostics");
    println!("==========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found at {}", config_path.display());
    } else {
        println!("  ℹ️  No config file, using built-in defaults");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. Fix the config before running other checks.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured");
        let provider = thirdvoice_providers::build_from_config(&config);
        match provider.health_check().await {
            Ok(true) => println!("  ✅ Endpoint {} reachable", config.base_url),
            Ok(false) => {
                println!("  ❌ Endpoint {} rejected the API key or is unhealthy", config.base_url);
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Endpoint {} unreachable: {e}", config.base_url);
                issues += 1;
            }
        }
    } else {
        println!("  ⚠️  No API key, every request will use the offline fallback");
        println!("      Set THIRDVOICE_API_KEY or OPENROUTER_API_KEY, or add api_key to config.toml");
        issues += 1;
    }

    println!(
        "  ✅ {} model(s) configured, primary: {}",
        config.models.len(),
        config.models.first().map(|m| m.display_name.as_str()).unwrap_or("-")
    );

    match thirdvoice_cache::build_from_config(&config.cache).await {
        Ok(cache) => match cache.count().await {
            Ok(count) => println!("  ✅ Cache backend '{}' ready ({count} entries)", cache.name()),
            Err(e) => {
                println!("  ❌ Cache backend '{}' unreadable: {e}", cache.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Cache backend '{}' failed to open: {e}", config.cache.backend);
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
