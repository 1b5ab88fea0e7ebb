//! AI provider configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::adapters::ai::AnthropicConfig;

use super::error::ValidationError;

/// AI provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Anthropic API key.
    pub anthropic_api_key: Option<String>,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on transient failures.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl AiConfig {
    /// Get timeout as Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if Anthropic is configured.
    pub fn has_anthropic(&self) -> bool {
        self.anthropic_api_key
            .as_ref()
            .is_some_and(|k| !k.is_empty())
    }

    /// Validate AI configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_anthropic() {
            return Err(ValidationError::NoAiProviderConfigured);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::invalid(
                "ai.timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Builds the provider configuration for the Anthropic adapter.
    pub fn provider_config(&self) -> Result<AnthropicConfig, ValidationError> {
        let key = self
            .anthropic_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ValidationError::MissingRequired("ANTHROPIC_API_KEY"))?;

        Ok(AnthropicConfig::new(key)
            .with_model(self.model.clone())
            .with_timeout(self.timeout())
            .with_max_retries(self.max_retries))
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            model: default_model(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}
