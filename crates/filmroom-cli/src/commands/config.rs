use std::path::Path;

use anyhow::{Context, Result};
use filmroom_session::{config, Config};
use toml_edit::{value, DocumentMut};

/// Show the current effective configuration.
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!(
        "File exists: {}\n",
        if exists { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    for key in config::KEYS {
        println!("  {key}: {}", config.value_of(key).unwrap_or_default());
    }

    println!("\nPriority: CLI args > ENV vars (FILMROOM_*) > Config file > Defaults");

    Ok(())
}

/// Get a specific config value, or print the whole file.
pub fn get_config(key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        let config = Config::load()?;
        let Some(value) = config.value_of(&key) else {
            anyhow::bail!(
                "Unknown config key: {}\n\nValid keys: {}",
                key,
                config::KEYS.join(", ")
            );
        };
        println!("{value}");
    } else {
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{}", contents);
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'filmroom config init' to create it.");
        }
    }

    Ok(())
}

/// Set a config value, keeping the rest of the file (comments included)
/// as it was.
pub fn set_config(key: &str, new_value: &str) -> Result<()> {
    let config_path = config::config_file_path();
    config::ensure_config_file()?;

    update_file(&config_path, key, new_value)?;

    println!("✓ Updated {} = {}", key, new_value);
    println!("  in {}", config_path.display());

    Ok(())
}

fn update_file(path: &Path, key: &str, new_value: &str) -> Result<()> {
    let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
    let updated = set_key(&contents, key, new_value)?;
    std::fs::write(path, updated).context("Failed to write config file")?;
    Ok(())
}

/// Set `key` in a TOML document, returning the edited text.
fn set_key(contents: &str, key: &str, new_value: &str) -> Result<String> {
    if !config::FILE_KEYS.contains(&key) {
        anyhow::bail!(
            "Unknown config key: {}\n\nValid keys: {}",
            key,
            config::FILE_KEYS.join(", ")
        );
    }

    let mut doc = contents
        .parse::<DocumentMut>()
        .context("Config file is not valid TOML")?;

    if config::INTEGER_KEYS.contains(&key) {
        let number: i64 = new_value
            .parse()
            .with_context(|| format!("{key} must be a whole number of milliseconds"))?;
        if number <= 0 {
            anyhow::bail!("{key} must be positive");
        }
        doc[key] = value(number);
    } else {
        doc[key] = value(new_value);
    }

    Ok(doc.to_string())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    let config_path = config::config_file_path();
    println!("{}", config_path.display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure filmroom.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
