//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for text-generation backends (Ollama, scripted
//! stubs, hosted APIs) so the reasoning loop works with any of them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::LlmProvider;
//!
//! let provider = OllamaProvider::from_env();
//! let text = provider.generate(&prompt, &context).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::CallContext;
use crate::error::{AgentError, Result};

/// Sampling configuration for providers that support it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama3.2", "qwen2.5")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 2048 }
fn default_top_p() -> f32 { 0.9 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
        }
    }
}

/// Strategy trait for text-generation backends
///
/// The agent works exclusively through this interface. Failures to reach
/// or use the backend must be returned as `Err`, never as reply text, so
/// the loop can tell them apart from an answer.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Generate free text from a prompt
    async fn generate(&self, prompt: &str, context: &CallContext) -> Result<String>;

    /// Generate a JSON value shaped by `schema` (best effort)
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        context: &CallContext,
    ) -> Result<serde_json::Value> {
        let structured_prompt = format!(
            "{}\n\nRespond ONLY with valid JSON matching this schema:\n{}\n\nJSON Response:",
            prompt,
            serde_json::to_string_pretty(schema)?
        );

        let response = self.generate(&structured_prompt, context).await?;
        let candidate = extract_json(&response);

        serde_json::from_str(candidate).map_err(|e| {
            AgentError::Parse(format!("structured response is not valid JSON: {}", e))
        })
    }
}

/// Strip a ```` ```json ```` (or bare ```` ``` ````) fence around a JSON reply
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    let fenced = trimmed
        .split_once("```json")
        .or_else(|| trimmed.split_once("```"))
        .map(|(_, after)| after);

    match fenced {
        Some(after) => after.split("```").next().unwrap_or(after).trim(),
        None => trimmed,
    }
}
