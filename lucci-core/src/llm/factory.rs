//! Factory for creating LLM providers from configuration

use crate::config::{LLMProvider as LLMProviderType, LLMProviderConfig};
use crate::error::Result;
use crate::llm::LLMProvider;
use crate::llm::providers::KeywordProvider;
use std::sync::Arc;

#[cfg(feature = "llm-openai")]
use crate::llm::providers::openai::OpenAIProvider;

/// Factory for creating LLM providers
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be created (e.g., missing API key)
    pub fn create(config: &LLMProviderConfig) -> Result<Arc<dyn LLMProvider>> {
        match config.provider {
            LLMProviderType::Keyword => Ok(Arc::new(KeywordProvider::new())),

            #[cfg(feature = "llm-openai")]
            LLMProviderType::OpenAI => {
                let model = if !config.model.is_empty() {
                    Some(config.model.clone())
                } else {
                    None
                };

                let provider = if let Some(api_key) = &config.api_key {
                    let model_str = model
                        .or_else(|| std::env::var("OPENAI_MODEL").ok())
                        .unwrap_or_else(|| "gpt-4o".to_string());

                    if let Some(base_url) = &config.base_url {
                        OpenAIProvider::with_base_url(api_key.clone(), model_str, base_url.clone())
                    } else {
                        OpenAIProvider::new(api_key.clone(), model_str)
                    }
                } else {
                    OpenAIProvider::from_env(model)?
                };

                tracing::info!(model = %provider.model(), "Using OpenAI completion engine");
                Ok(Arc::new(provider.with_timeout(config.request_timeout)))
            }

            #[cfg(not(feature = "llm-openai"))]
            LLMProviderType::OpenAI => Err(crate::error::LucciError::Configuration(
                "OpenAI provider requires 'llm-openai' feature".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_keyword() {
        let provider = LLMProviderFactory::create(&LLMProviderConfig::default()).unwrap();
        assert_eq!(provider.model_info().provider, "keyword");
    }

    #[cfg(feature = "llm-openai")]
    #[test]
    fn test_openai_with_explicit_key() {
        let config = LLMProviderConfig {
            provider: LLMProviderType::OpenAI,
            model: "gpt-4o-mini".to_string(),
            api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let provider = LLMProviderFactory::create(&config).unwrap();
        assert_eq!(provider.model_info().model_name, "gpt-4o-mini");
    }
}
