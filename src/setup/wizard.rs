//! First-run interactive setup.
//!
//! Steps:
//! 1. HTTP listener
//! 2. Completion API
//! 3. Weather tool key
//! 4. Write config

use crate::config::{self, RelayConfig, CONFIG_FILE_NAME};
use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Run the setup wizard against stdin and write `toolrelay.toml` into `home`.
pub fn run_setup_wizard(home: &Path) -> Result<RelayConfig> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    run_with(&mut reader, home)
}

fn run_with(reader: &mut impl BufRead, home: &Path) -> Result<RelayConfig> {
    println!("Welcome to toolrelay setup.\n");
    let defaults = RelayConfig::default();

    println!("[1/4] HTTP API");
    let listen_addr = prompt_with_default(reader, "  Listen address", &defaults.listen_addr)?;

    println!("\n[2/4] Completion API");
    let api_url = prompt_with_default(reader, "  API URL", &defaults.completion.api_url)?;
    let api_key = prompt(reader, "  API key (or press Enter to skip)")?;
    let model = prompt_with_default(reader, "  Model", &defaults.completion.model)?;

    println!("\n[3/4] Weather tool");
    let openweather_api_key = prompt(reader, "  OpenWeather API key (or press Enter to skip)")?;

    println!("\n[4/4] Writing configuration...");
    std::fs::create_dir_all(home)?;

    let mut config = RelayConfig {
        listen_addr,
        db_path: home.join("tools.db").to_string_lossy().into_owned(),
        openweather_api_key,
        ..defaults
    };
    config.completion.api_url = api_url;
    config.completion.api_key = api_key;
    config.completion.model = model;

    config::save_config(&config, &home.join(CONFIG_FILE_NAME))?;
    println!("  Written: {}", CONFIG_FILE_NAME);

    println!("\nSetup complete! Run `toolrelay seed` then `toolrelay serve`.\n");
    Ok(config)
}

/// Prompt the user for input with a label.
fn prompt(reader: &mut impl BufRead, label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    reader.read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Prompt with a default value.
fn prompt_with_default(reader: &mut impl BufRead, label: &str, default: &str) -> Result<String> {
    print!("{} [{}]: ", label, default);
    io::stdout().flush()?;
    let mut input = String::new();
    reader.read_line(&mut input)?;
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn blank_answers_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = Cursor::new("\n\n\n\n\n");
        let config = run_with(&mut input, dir.path()).unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert!(config.completion.api_key.is_empty());
        assert!(config.db_path.ends_with("tools.db"));

        let loaded = config::load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(loaded.db_path, config.db_path);
    }

    #[test]
    fn answers_are_written_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = Cursor::new("0.0.0.0:9000\nhttp://llm.local\nsk-1\nllama3\now-key\n");
        run_with(&mut input, dir.path()).unwrap();

        let loaded = config::load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(loaded.listen_addr, "0.0.0.0:9000");
        assert_eq!(loaded.completion.api_url, "http://llm.local");
        assert_eq!(loaded.completion.api_key, "sk-1");
        assert_eq!(loaded.completion.model, "llama3");
        assert_eq!(loaded.openweather_api_key, "ow-key");
    }
}
