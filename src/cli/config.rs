//! Config command handler
//!
//! View and modify configuration settings.

use crate::config::Config;
use crate::error::{Error, Result};
use clap::Args;

/// Config command arguments
#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration key (e.g., "map.default_style")
    pub key: Option<String>,

    /// Value to set (if not provided, shows current value)
    pub value: Option<String>,

    /// Show config file path
    #[arg(long)]
    pub path: bool,

    /// Reset config to defaults
    #[arg(long)]
    pub reset: bool,
}

/// Run the config command
pub fn run(args: ConfigArgs) -> Result<()> {
    // Show path
    if args.path {
        let path = Config::config_path()?;
        println!("{}", path.display());
        return Ok(());
    }

    // Reset config
    if args.reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        return Ok(());
    }

    let mut config = Config::load()?;

    match (&args.key, &args.value) {
        // No arguments: show all config
        (None, None) => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| Error::Config(format!("Failed to render config: {}", e)))?;
            print!("{}", rendered);
        }

        // Key only: show that value
        (Some(key), None) => {
            if let Some(value) = config.get(key) {
                println!("{}", value);
            } else {
                eprintln!("Unknown config key: {}", key);
                eprintln!("\nAvailable keys:");
                for k in related_keys(key) {
                    eprintln!("  {}", k);
                }
                std::process::exit(1);
            }
        }

        // Key and value: set the value
        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save()?;
            // `set` may normalize the value
            let stored = config.get(key).unwrap_or_else(|| value.clone());
            println!("{} = {}", key, stored);
        }

        // Value without key: not valid
        (None, Some(_)) => {
            eprintln!("Error: Must specify a key to set a value");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Keys in the same section as `key`, or every key if the section is unknown
fn related_keys(key: &str) -> Vec<&'static str> {
    let all = Config::available_keys();
    let section = key.split('.').next().unwrap_or_default();
    let related: Vec<_> = all
        .iter()
        .copied()
        .filter(|k| k.split('.').next() == Some(section))
        .collect();
    if related.is_empty() {
        all
    } else {
        related
    }
}
