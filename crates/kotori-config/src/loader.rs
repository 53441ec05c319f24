//! Layered settings loading: TOML file plus environment overrides.

use crate::Settings;
use kotori_common::Result;
use std::env;
use tracing::{debug, info};

/// Default settings file path, without extension (`config/kotori.toml`).
const DEFAULT_CONFIG_PATH: &str = "config/kotori";

/// Load settings from the TOML file and the environment.
///
/// Sources, later wins:
/// 1. `config/kotori.toml` (or `path`, when given), optional
/// 2. `KOTORI__` environment variables (`KOTORI__DATABASE__URL=...`)
/// 3. Well-known secret variables: `DISCORD_TOKEN`, `TMDB_API_KEY`, `OPENAI_KEY`
pub fn load_settings(path: Option<&str>) -> Result<Settings> {
    let file = path.unwrap_or(DEFAULT_CONFIG_PATH);
    debug!("Loading settings from {file}");

    let loaded = config::Config::builder()
        .add_source(config::File::with_name(file).required(false))
        .add_source(
            config::Environment::with_prefix("KOTORI")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let mut settings: Settings = loaded.try_deserialize()?;

    if let Ok(token) = env::var("DISCORD_TOKEN") {
        settings.discord.token = token;
    }
    if let Ok(key) = env::var("TMDB_API_KEY") {
        settings.catalogs.tmdb_api_key = Some(key);
    }
    if let Ok(key) = env::var("OPENAI_KEY") {
        settings.completion.api_key = Some(key);
    }

    settings.validate()?;
    info!("Settings loaded and validated");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_fails_validation_without_token() {
        // No file and no DISCORD_TOKEN in a clean env var name space:
        // validation must reject the empty token.
        if env::var("DISCORD_TOKEN").is_err() {
            let result = load_settings(Some("does/not/exist"));
            assert!(result.is_err());
        }
    }
}
