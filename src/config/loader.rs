// Configuration loader
// Loads ~/.solace/config.toml (or an explicit path) and applies environment overrides

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;
use crate::errors::config_parse_error;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "SOLACE_CONFIG";

/// Load configuration from a file (if any) and the environment
///
/// Lookup order: `explicit` path, `$SOLACE_CONFIG`, `~/.solace/config.toml`.
/// An explicit path that does not exist is an error; a missing default file
/// just means defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match config_path(explicit)? {
        Some(path) => load_from_file(&path)?,
        None => {
            tracing::debug!("No config file found, using defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Parse a TOML config file
pub fn load_from_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!(config_parse_error(&path.display().to_string(), &e.to_string())))?;

    tracing::info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

fn config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    let requested = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

    if let Some(path) = requested {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        return Ok(Some(path));
    }

    let Some(home) = dirs::home_dir() else {
        return Ok(None);
    };
    let default_path = home.join(".solace/config.toml");
    Ok(default_path.exists().then_some(default_path))
}

/// Apply environment overrides on top of file settings
///
/// `lookup` is injected so tests don't have to mutate the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(provider) = non_empty("SOLACE_LLM_PROVIDER") {
        config.llm.provider = provider;
    }

    if config.llm.api_key().is_none() {
        let key_var = match config.llm.provider.as_str() {
            "openai" => "OPENAI_API_KEY",
            "claude" => "ANTHROPIC_API_KEY",
            _ => "GEMINI_API_KEY",
        };
        if let Some(key) = non_empty(key_var) {
            config.llm.api_key = Some(key);
        }
    }

    if let Some(endpoint) = non_empty("SOLACE_GENERATOR_URL") {
        config.generator.endpoint = Some(endpoint);
    }
    if let Some(token) = non_empty("SOLACE_GENERATOR_TOKEN") {
        config.generator.api_token = Some(token);
    }
    if let Some(bind) = non_empty("SOLACE_BIND") {
        config.server.bind_address = bind;
    }
}
