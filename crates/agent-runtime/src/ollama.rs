//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference.

use std::time::Duration;

use agent_core::{
    context::CallContext,
    error::{AgentError, Result},
    provider::{GenerationOptions, LlmProvider},
};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    models::ModelOptions,
    Ollama,
};

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Model and sampling settings
    pub options: GenerationOptions,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            timeout_secs: 120,
            options: GenerationOptions::default(),
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("OLLAMA_HOST").unwrap_or(defaults.host);
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let timeout_secs = std::env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        let mut options = defaults.options;
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            options.model = model;
        }

        Self {
            host,
            port,
            timeout_secs,
            options,
        }
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a new Ollama provider with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
            ..Default::default()
        })
    }

    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Self {
        Self::from_config(OllamaConfig::default())
    }

    pub fn model(&self) -> &str {
        &self.config.options.model
    }

    /// Build Ollama model options
    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX))
    }

    fn build_request(&self, prompt: &str) -> ChatMessageRequest {
        ChatMessageRequest::new(
            self.config.options.model.clone(),
            vec![ChatMessage::user(prompt.to_string())],
        )
        .options(Self::build_options(&self.config.options))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn generate(&self, prompt: &str, context: &CallContext) -> Result<String> {
        tracing::debug!(
            model = %self.config.options.model,
            session = %context.session_id,
            prompt_chars = prompt.len(),
            "Sending prompt to Ollama"
        );

        let request = self.build_request(prompt);
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let response = tokio::time::timeout(timeout, self.client.send_chat_messages(request))
            .await
            .map_err(|_| {
                AgentError::ProviderUnavailable(format!(
                    "no reply from {}:{} within {}s",
                    self.config.host, self.config.port, self.config.timeout_secs
                ))
            })?
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        Ok(response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 11434);
        assert_eq!(config.options.model, "llama3.2");
    }

    #[test]
    fn test_provider_uses_configured_model() {
        let provider = OllamaProvider::from_config(OllamaConfig {
            options: GenerationOptions {
                model: "qwen2.5".into(),
                ..Default::default()
            },
            ..Default::default()
        });

        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "qwen2.5");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let provider = OllamaProvider::from_config(OllamaConfig {
            host: "http://127.0.0.1".into(),
            port: 1,
            timeout_secs: 5,
            ..Default::default()
        });
        let context = CallContext::new(
            "u1",
            agent_core::SessionId::from_string("s1"),
            agent_core::AgentMode::Individual,
        );

        assert!(provider.generate("hello", &context).await.is_err());
        assert!(!provider.health_check().await.unwrap());
    }
}
