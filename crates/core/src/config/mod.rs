//! Configuration loading.
//!
//! A TOML file merged with `SUBTITLINO_`-prefixed environment variables;
//! every field has a default, so running with nothing but the environment
//! (or nothing at all, for anonymous use) works.

mod loader;
mod types;

use thiserror::Error;

pub use loader::{load_config, load_config_from_str, load_env_config};
pub use types::Config;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}
