//! Configuration types and loading
//!
//! Config is YAML, loaded from `--config`, else `~/.config/storyforge.yml`,
//! else defaults. Every section has serde defaults so a partial file works.

use std::path::{Path, PathBuf};

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider settings
    pub llm: LlmConfig,

    /// Wizard behavior settings
    pub wizard: WizardConfig,

    /// Session storage settings
    pub sessions: SessionsConfig,

    /// Log level override (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from an explicit path or the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = default_config_path();
                if !default.exists() {
                    tracing::debug!("Config::load: no config file, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.display());
        Ok(config)
    }
}

/// Default config file location
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storyforge.yml")
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "openai" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    /// Resolve into a config ready for client construction
    pub fn resolve(&self) -> Result<ResolvedLlmConfig> {
        if self.model.is_empty() {
            return Err(eyre!("LLM model must not be empty"));
        }
        Ok(ResolvedLlmConfig {
            provider: self.provider.clone(),
            model: self.model.clone(),
            api_key_env: self.api_key_env.clone(),
            base_url: self.base_url.clone(),
            max_tokens: self.max_tokens,
            timeout_ms: self.timeout_ms,
        })
    }
}

/// Fully resolved LLM configuration for a specific provider/model
#[derive(Debug, Clone)]
pub struct ResolvedLlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl ResolvedLlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .map_err(|_| eyre!("API key environment variable not set: {}", self.api_key_env))
    }
}

/// Wizard behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Personas offered by default when configuring a round
    #[serde(rename = "default-personas")]
    pub default_personas: Vec<String>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            default_personas: vec!["developer".to_string(), "qa".to_string()],
        }
    }
}

/// Session storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Directory where sessions are stored
    pub dir: Option<PathBuf>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self { dir: None }
    }
}

impl SessionsConfig {
    /// Resolve the sessions directory, defaulting to the local data dir
    pub fn resolve_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("storyforge")
                .join("sessions")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.max_tokens, 8192);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
llm:
  model: "gpt-4o-mini"
  max-tokens: 2048
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 2048);
        // Untouched fields keep their defaults
        assert_eq!(config.llm.provider, "openai");
    }

    #[test]
    fn test_resolve_rejects_empty_model() {
        let config = LlmConfig {
            model: String::new(),
            ..Default::default()
        };
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_sessions_dir_override() {
        let config = SessionsConfig {
            dir: Some(PathBuf::from("/tmp/sessions")),
        };
        assert_eq!(config.resolve_dir(), PathBuf::from("/tmp/sessions"));
    }
}
