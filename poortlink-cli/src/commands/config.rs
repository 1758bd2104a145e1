//! Config command - print the effective configuration.

use std::path::Path;

use console::style;
use poortlink::config::ConfigFile;

use crate::commands::common::load_config;
use crate::error::CliError;

/// Run the config command.
pub fn run(config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;

    let origin = if config_path.exists() {
        "file"
    } else {
        "defaults, file not found"
    };
    println!(
        "{} {} ({})",
        style("Configuration:").bold(),
        config_path.display(),
        origin
    );
    println!();

    for (section, entries) in effective_settings(&config) {
        println!("[{}]", style(section).cyan());
        for (key, value) in entries {
            println!("  {} = {}", key, value);
        }
        println!();
    }
    Ok(())
}

/// Settings grouped by INI section, in file order.
fn effective_settings(config: &ConfigFile) -> Vec<(&'static str, Vec<(&'static str, String)>)> {
    vec![
        ("zones", vec![("file", config.zones.file.display().to_string())]),
        (
            "tracker",
            vec![
                ("high_accuracy", config.tracker.high_accuracy.to_string()),
                ("maximum_age_secs", config.tracker.maximum_age_secs.to_string()),
                ("timeout_secs", config.tracker.timeout_secs.to_string()),
                ("discovery_radius_m", config.tracker.discovery_radius_m.to_string()),
            ],
        ),
        (
            "events",
            vec![("channel_capacity", config.events.channel_capacity.to_string())],
        ),
        (
            "logging",
            vec![
                ("directory", config.logging.directory.display().to_string()),
                ("file", config.logging.file.clone()),
            ],
        ),
    ]
}
