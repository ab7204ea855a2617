//! Config commands - inspect and update `~/.scanproxy/config.json`.

use anyhow::Result;
use scanproxy_core::adapters::PersistentSettingsStore;
use scanproxy_core::ports::SettingsStore;
use scanproxy_core::ConfigStore;

pub async fn show(json: bool) -> Result<()> {
    let store = ConfigStore::new()?;
    let config = store.load().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let throttle = &config.throttle;
    println!("Config file:        {}", store.config_path().display());
    let throttling = if config.scan_throttle_enabled {
        "enabled"
    } else {
        "disabled"
    };
    println!("Scan throttling:    {}", throttling);
    println!(
        "Foreground limit:   {} requests / {} ms",
        throttle.foreground_max_requests, throttle.foreground_window_ms
    );
    println!("Background spacing: {} ms", throttle.background_interval_ms);
    println!("Importance cutoff:  {}", throttle.foreground_importance_threshold);

    if throttle.exception_packages.is_empty() {
        println!("Exception packages: none");
    } else {
        println!("Exception packages:");
        for package in &throttle.exception_packages {
            println!("  {}", package);
        }
    }
    Ok(())
}

pub async fn set_throttle(enabled: bool) -> Result<()> {
    let settings = PersistentSettingsStore::open(ConfigStore::new()?).await?;
    let previous = settings.scan_throttle_enabled();

    settings.set_scan_throttle_enabled(enabled)?;
    settings.flush().await?;

    if previous == enabled {
        println!("Scan throttling already {}", if enabled { "enabled" } else { "disabled" });
    } else {
        println!("Scan throttling {}", if enabled { "enabled" } else { "disabled" });
    }
    Ok(())
}
