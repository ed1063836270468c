//! # agent-runtime
//!
//! Runtime providers for the compliance copilot.
//!
//! ## Providers
//!
//! - **Ollama** (default feature): local LLM inference via Ollama
//! - **Scripted**: deterministic replies for offline demos and tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::OllamaProvider;
//!
//! let provider = OllamaProvider::from_env();
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

pub mod mock;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use mock::ScriptedProvider;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentBuilder, AgentError, AgentResponse, CallContext, LlmProvider, Result, Tool,
    ToolRegistry,
};
