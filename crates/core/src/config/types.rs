use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_SERVER, DEFAULT_USER_AGENT};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// XML-RPC endpoint of the subtitle service.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// User agent reported on login (register your own with the service).
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Account name; empty logs in anonymously.
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    /// Subtitle languages, comma separated (e.g. "eng,ger").
    #[serde(default = "default_language")]
    pub language: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            user_agent: default_user_agent(),
            login: String::new(),
            password: String::new(),
            language: default_language(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Config {
    /// The configured languages as the list the search calls take.
    pub fn languages(&self) -> Vec<String> {
        self.language
            .split(',')
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_timeout() -> u32 {
    30
}
