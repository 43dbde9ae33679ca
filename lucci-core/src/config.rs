//! Configuration types for the Lucci agent

use crate::actions::{DEFAULT_TRANSFER_CHAINS, ProtocolRouting};
use crate::error::{LucciError, Result};
use crate::llm::RetryConfig;
use crate::tools::ToolRuntimeConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "lucci.toml";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LucciConfig {
    /// Control loop configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Completion engine configuration
    #[serde(default)]
    pub llm: LLMProviderConfig,

    /// Tool execution and action configuration
    #[serde(default)]
    pub tools: ToolsConfig,

    /// HTTP endpoint configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Control loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum completion-engine calls per turn
    pub max_steps: usize,

    /// Wallet address used when a request carries none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_address: Option<String>,

    /// Replaces the built-in system prompt; must contain `{{CONTEXT_STRING}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 5,
            user_address: None,
            system_prompt: None,
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMProviderConfig {
    /// Provider type
    pub provider: LLMProvider,

    /// Model name
    pub model: String,

    /// API key (if needed, prefer env vars)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL (for OpenAI-compatible endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// HTTP request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for LLMProviderConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Keyword,
            model: String::new(),
            api_key: None,
            base_url: None,
            temperature: None,
            request_timeout: Duration::from_secs(60),
            retry: RetryConfig::default(),
        }
    }
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    /// OpenAI or any compatible chat-completions endpoint
    OpenAI,
    /// Offline keyword router
    Keyword,
}

/// Tool execution and action configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub runtime: ToolRuntimeConfig,

    /// Default swap protocol per chain
    #[serde(default)]
    pub routing: ProtocolRouting,

    /// Chains transfers may target
    pub transfer_chains: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            runtime: ToolRuntimeConfig::default(),
            routing: ProtocolRouting::default(),
            transfer_chains: DEFAULT_TRANSFER_CHAINS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// HTTP endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Configuration builder
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: LucciConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent(mut self, config: AgentConfig) -> Self {
        self.config.agent = config;
        self
    }

    pub fn llm(mut self, config: LLMProviderConfig) -> Self {
        self.config.llm = config;
        self
    }

    pub fn tools(mut self, config: ToolsConfig) -> Self {
        self.config.tools = config;
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.config.agent.max_steps = max_steps;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<LucciConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl LucciConfig {
    /// Per-user config file location (`~/.config/lucci/lucci.toml` on Linux)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lucci").join(CONFIG_FILE_NAME))
    }

    /// Load configuration from files and environment variables.
    ///
    /// Loads in this order, later sources overriding earlier ones:
    /// 1. Default configuration
    /// 2. User config file (see [`LucciConfig::user_config_path`])
    /// 3. `lucci.toml` in the working directory
    /// 4. File named by `LUCCI_CONFIG_PATH`
    /// 5. `LUCCI_*` environment variables, `__` separating nested keys
    ///    (e.g. `LUCCI_AGENT__MAX_STEPS=8`)
    ///
    /// # Errors
    ///
    /// Returns an error if a source is malformed or the result fails validation.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(LucciConfig::default()));

        if let Some(path) = Self::user_config_path() {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Toml::file(CONFIG_FILE_NAME));

        if let Ok(path) = std::env::var("LUCCI_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: LucciConfig = figment
            .merge(Env::prefixed("LUCCI_").split("__"))
            .extract()
            .map_err(|e| {
                LucciError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let path = path.as_ref();
        if !path.exists() {
            return Err(LucciError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let config: LucciConfig = Figment::from(Serialized::defaults(LucciConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                LucciError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_steps == 0 {
            return Err(LucciError::Configuration(
                "agent.max_steps must be at least 1".to_string(),
            ));
        }

        if let Some(prompt) = &self.agent.system_prompt {
            if !prompt.contains(crate::agent::CONTEXT_PLACEHOLDER) {
                return Err(LucciError::Configuration(format!(
                    "agent.system_prompt must contain {}",
                    crate::agent::CONTEXT_PLACEHOLDER
                )));
            }
        }

        if self.tools.runtime.default_timeout.is_zero()
            || self.tools.runtime.tool_timeouts.values().any(|t| t.is_zero())
        {
            return Err(LucciError::Configuration(
                "tool timeouts must be greater than zero".to_string(),
            ));
        }

        if self.llm.request_timeout.is_zero() {
            return Err(LucciError::Configuration(
                "llm.request_timeout must be greater than zero".to_string(),
            ));
        }

        if self.llm.retry.max_attempts == 0 {
            return Err(LucciError::Configuration(
                "llm.retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.tools.transfer_chains.iter().any(|c| c.trim().is_empty()) {
            return Err(LucciError::Configuration(
                "tools.transfer_chains must not contain empty names".to_string(),
            ));
        }

        self.tools.routing.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = LucciConfig::default();
        assert_eq!(config.agent.max_steps, 5);
        assert_eq!(config.llm.provider, LLMProvider::Keyword);
        assert_eq!(config.tools.routing.resolve("solana"), Some("jupiter"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_merges_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[agent]
max_steps = 3
user_address = "0xfeed"

[llm]
provider = "openai"
model = "gpt-4o-mini"

[tools.runtime]
default_timeout = "5s"

[tools.routing]
fallback = "0x"

[tools.routing.routes]
Arbitrum = "camelot"
optimism = "velodrome"
"#
        )
        .unwrap();

        let config = LucciConfig::from_file(file.path()).unwrap();
        assert_eq!(config.agent.max_steps, 3);
        assert_eq!(config.agent.user_address.as_deref(), Some("0xfeed"));
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.llm.request_timeout, Duration::from_secs(60));
        assert_eq!(config.tools.runtime.default_timeout, Duration::from_secs(5));
        assert_eq!(config.tools.routing.resolve("arbitrum"), Some("camelot"));
        assert_eq!(config.tools.routing.resolve("Optimism"), Some("velodrome"));
        assert!(config.tools.routing.chains().all(|c| c == c.to_lowercase()));
        assert_eq!(config.tools.routing.resolve("solana"), Some("jupiter"));
        assert_eq!(config.tools.routing.resolve("tron"), Some("0x"));
    }

    #[test]
    fn test_zero_max_steps_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent]\nmax_steps = 0").unwrap();

        let err = LucciConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, LucciError::Configuration(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = LucciConfig::from_file("/nonexistent/lucci.toml").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_prompt_override_needs_placeholder() {
        let mut config = LucciConfig::default();
        config.agent.system_prompt = Some("You are a bot.".to_string());
        assert!(config.validate().is_err());

        config.agent.system_prompt = Some("Context: {{CONTEXT_STRING}}".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ConfigBuilder::new().max_steps(8).build().unwrap();
        assert_eq!(config.agent.max_steps, 8);
        assert!(ConfigBuilder::new().max_steps(0).build().is_err());
    }

    #[test]
    fn test_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LUCCI_AGENT__MAX_STEPS", "7");
            jail.set_env("LUCCI_LLM__PROVIDER", "openai");
            jail.create_file(CONFIG_FILE_NAME, "[agent]\nmax_steps = 2\nuser_address = \"0xabc\"")?;

            let config = LucciConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.agent.max_steps, 7);
            assert_eq!(config.agent.user_address.as_deref(), Some("0xabc"));
            assert_eq!(config.llm.provider, LLMProvider::OpenAI);
            Ok(())
        });
    }
}
