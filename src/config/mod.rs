// src/config/mod.rs
// All tunables come from the environment with sane defaults.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct MaestroConfig {
    // ── Completion Provider Configuration
    pub openai_base_url: String,
    pub openrouter_base_url: String,
    pub default_model: String,
    pub max_output_tokens: usize,

    // ── Request Handling
    pub request_timeout: u64,
    pub api_max_retries: usize,
    pub api_retry_delay_ms: u64,

    // ── Knowledge Store Configuration
    pub knowledge_config_path: String,

    // ── Server Configuration
    pub host: String,
    pub port: u16,

    // ── Logging Configuration
    pub log_level: String,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            // Tolerate trailing comments and whitespace in .env values
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    warn!("Config: {} = '{}' failed to parse, using default", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl MaestroConfig {
    pub fn from_env() -> Self {
        Self {
            openai_base_url: env_var_or("OPENAI_BASE_URL", "https://api.openai.com".to_string()),
            openrouter_base_url: env_var_or(
                "OPENROUTER_BASE_URL",
                "https://openrouter.ai/api".to_string(),
            ),
            default_model: env_var_or("MAESTRO_MODEL", "gpt-4o".to_string()),
            max_output_tokens: env_var_or("MAESTRO_MAX_OUTPUT_TOKENS", 4096),
            request_timeout: env_var_or("MAESTRO_REQUEST_TIMEOUT", 120),
            api_max_retries: env_var_or("MAESTRO_API_MAX_RETRIES", 3),
            api_retry_delay_ms: env_var_or("MAESTRO_API_RETRY_DELAY_MS", 500),
            knowledge_config_path: env_var_or(
                "MAESTRO_KNOWLEDGE_CONFIG",
                "./knowledge.json".to_string(),
            ),
            host: env_var_or("MAESTRO_HOST", "0.0.0.0".to_string()),
            port: env_var_or("MAESTRO_PORT", 3400),
            log_level: env_var_or("MAESTRO_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<MaestroConfig> = Lazy::new(MaestroConfig::from_env);

// ============================================================================
// Knowledge store configuration
// ============================================================================

/// Identifiers of the document/knowledge search backends, auto-injected into
/// search-tool calls. Loaded once and handed to the orchestrator as a plain
/// value object; the engine itself never touches the file system.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
}

impl KnowledgeConfig {
    /// Read from a JSON file. A missing or unparseable file yields the empty
    /// list rather than an error.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Self>(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        "Knowledge config {} is malformed ({}), using empty list",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = MaestroConfig::from_env();

        assert!(!config.default_model.is_empty());
        assert!(config.api_max_retries > 0);
        assert!(config.bind_address().contains(':'));
    }

    #[test]
    fn test_knowledge_config_missing_file() {
        let config = KnowledgeConfig::load("/definitely/not/a/real/path.json");
        assert!(config.vector_store_ids.is_empty());
    }

    #[test]
    fn test_knowledge_config_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "this is not json").unwrap();

        let config = KnowledgeConfig::load(file.path());
        assert!(config.vector_store_ids.is_empty());
    }

    #[test]
    fn test_knowledge_config_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"vector_store_ids": ["vs_alpha", "vs_beta"]}}"#).unwrap();

        let config = KnowledgeConfig::load(file.path());
        assert_eq!(config.vector_store_ids, vec!["vs_alpha", "vs_beta"]);
    }

    #[test]
    fn test_knowledge_config_missing_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"unrelated": true}}"#).unwrap();

        let config = KnowledgeConfig::load(file.path());
        assert!(config.vector_store_ids.is_empty());
    }
}
