use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable prefix for overrides (SUBTITLINO_LOGIN, ...).
const ENV_PREFIX: &str = "SUBTITLINO_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from the environment alone (no config file)
pub fn load_env_config() -> Result<Config, ConfigError> {
    Figment::new()
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
login = "someone"
language = "eng,ger"
timeout_secs = 10
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.login, "someone");
        assert_eq!(config.language, "eng,ger");
        assert_eq!(config.timeout_secs, 10);
        // Unset fields keep their defaults.
        assert_eq!(config.server_url, crate::client::DEFAULT_SERVER);
    }

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert!(config.login.is_empty());
        assert_eq!(config.language, "eng");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let result = load_config_from_str("timeout_secs = \"soon\"");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
login = "user"
password = "secret"
language = "fre"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.login, "user");
        assert_eq!(config.password, "secret");
        assert_eq!(config.language, "fre");
    }

    #[test]
    fn test_languages_splits_and_trims() {
        let config = load_config_from_str("language = \"eng, ger,,rus\"").unwrap();
        assert_eq!(config.languages(), vec!["eng", "ger", "rus"]);
    }
}
