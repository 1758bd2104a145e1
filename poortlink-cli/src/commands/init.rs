//! Init command - initialize configuration file.

use std::path::Path;

use poortlink::config::ConfigFile;

use crate::error::CliError;

/// Run the init command.
pub fn run(config_path: &Path, force: bool) -> Result<(), CliError> {
    if config_path.exists() && !force {
        println!("Configuration file already exists: {}", config_path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    let config = ConfigFile::default();
    config.save_to(config_path)?;

    println!("Configuration file: {}", config_path.display());
    println!("Zone file:          {}", config.zones.file.display());
    println!();
    println!("Edit the configuration file to customize PoortLink settings.");
    Ok(())
}
