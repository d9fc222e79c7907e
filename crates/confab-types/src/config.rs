//! Global configuration types for Confab.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! completion provider and chat defaults.

use serde::{Deserialize, Serialize};

/// Top-level configuration for Confab.
///
/// Loaded from `~/.confab/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default completion model for new chats.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Override the provider's base URL (OpenAI-compatible endpoints).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the provider API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Sampling temperature for completions.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum output tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Delay in milliseconds before a deferred scroll-to-end fires.
    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "CONFAB_API_KEY".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_scroll_delay_ms() -> u64 {
    100
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            scroll_delay_ms: default_scroll_delay_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.api_key_env, "CONFAB_API_KEY");
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.scroll_delay_ms, 100);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_global_config_deserialize_empty_uses_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert!((config.temperature - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_global_config_deserialize_with_values() {
        let toml_str = r#"
default_model = "llama-3.1-70b"
base_url = "http://localhost:11434/v1"
api_key_env = "OLLAMA_KEY"
max_tokens = 2048
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_model, "llama-3.1-70b");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:11434/v1"));
        assert_eq!(config.api_key_env, "OLLAMA_KEY");
        assert_eq!(config.max_tokens, 2048);
        // Unspecified fields keep their defaults.
        assert_eq!(config.scroll_delay_ms, 100);
    }

    #[test]
    fn test_global_config_serde_roundtrip() {
        let config = GlobalConfig {
            default_model: "gpt-4o".to_string(),
            base_url: Some("https://example.test/v1".to_string()),
            api_key_env: "MY_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 512,
            scroll_delay_ms: 50,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GlobalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.default_model, "gpt-4o");
        assert_eq!(parsed.scroll_delay_ms, 50);
    }
}
