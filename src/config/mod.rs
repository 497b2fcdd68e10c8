// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Prefix of environment variables overriding file settings,
/// e.g. `ARANGO_HEALTH__ARANGODB__DATABASE=custom`.
pub const ENV_PREFIX: &str = "ARANGO_HEALTH";

/// Load configuration from a file (YAML or JSON), then apply environment overrides
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .context("Failed to read config file")?;

    let is_yaml = matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    );
    let config = parse_config(&contents, is_yaml)?;
    let config = apply_env_overrides(config)?;

    config.validate()?;
    Ok(config)
}

pub fn parse_config(contents: &str, is_yaml: bool) -> Result<Config> {
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = if is_yaml {
        serde_yaml::from_str(contents).context("Failed to parse YAML config")?
    } else {
        serde_json::from_str(contents).context("Failed to parse JSON config")?
    };
    Ok(config)
}

/// Layer `ARANGO_HEALTH__*` environment variables over an already parsed config.
pub fn apply_env_overrides(config: Config) -> Result<Config> {
    let layered = ::config::Config::builder()
        .add_source(::config::Config::try_from(&config).context("Failed to stage config")?)
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to apply environment overrides")?;

    layered
        .try_deserialize::<Config>()
        .context("Failed to deserialize layered config")
}
