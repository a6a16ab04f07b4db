//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;
use crate::Result;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider to use (currently only "gemini")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Gemini API key (overridden by GEMINI_API_KEY)
    #[serde(default)]
    pub gemini_api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Serper API key for web search (overridden by SERPER_API_KEY).
    /// Missing key degrades web_search to a fixed unavailability message.
    #[serde(default)]
    pub serper_api_key: String,

    /// Base URL of the retrieval service fronting the vector store
    /// (overridden by RETRIEVAL_URL)
    #[serde(default = "default_retrieval_url")]
    pub retrieval_url: String,

    /// Logical database name the retrieval service partitions live in
    #[serde(default = "default_db_name")]
    pub db_name: String,

    /// Maximum model round-trips per turn before failing closed
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Seconds of inactivity before a session is evicted
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Upper bound on concurrently kept sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Port for the HTTP server
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_retrieval_url() -> String {
    "http://127.0.0.1:8100".to_string()
}

fn default_db_name() -> String {
    "rag".to_string()
}

fn default_max_rounds() -> usize {
    8
}

fn default_session_ttl_secs() -> u64 {
    60 * 60 * 24
}

fn default_max_sessions() -> usize {
    1024
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            gemini_api_key: String::new(),
            model: default_model(),
            serper_api_key: String::new(),
            retrieval_url: default_retrieval_url(),
            db_name: default_db_name(),
            max_rounds: default_max_rounds(),
            session_ttl_secs: default_session_ttl_secs(),
            max_sessions: default_max_sessions(),
            port: default_port(),
        }
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kampus")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from file, falling back to defaults when the file
/// does not exist, then apply environment overrides for secrets.
pub fn load() -> Result<Config> {
    // .env is optional; ignore a missing file
    dotenvy::dotenv().ok();

    let path = config_path();
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content)?
    } else {
        Config::default()
    };

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        config.gemini_api_key = key;
    }
    if let Ok(key) = std::env::var("SERPER_API_KEY") {
        config.serper_api_key = key;
    }
    if let Ok(url) = std::env::var("RETRIEVAL_URL") {
        config.retrieval_url = url;
    }

    Ok(config)
}

/// Save configuration to file
pub fn save(config: &Config) -> Result<()> {
    let path = config_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}

/// Validate that the configured provider can actually be constructed.
pub fn validate(config: &Config) -> Result<()> {
    if config.provider == "gemini" && config.gemini_api_key.is_empty() {
        return Err(Error::Config(
            "gemini_api_key is empty (set GEMINI_API_KEY or edit ~/.kampus/config.json)"
                .to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.max_rounds, 8);
        assert_eq!(config.max_sessions, 1024);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.db_name, config.db_name);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = serde_json::from_str(r#"{"model": "gemini-2.0-pro"}"#).unwrap();
        assert_eq!(parsed.model, "gemini-2.0-pro");
        assert_eq!(parsed.max_rounds, 8);
    }
}
