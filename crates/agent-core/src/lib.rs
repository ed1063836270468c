//! # agent-core
//!
//! Orchestration core for a tool-using compliance assistant: a bounded
//! plan → act → observe loop over a provider-agnostic LLM abstraction.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Agent                               │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐   │
//! │  │  Reasoning  │  │    Tools    │  │   LlmProvider       │   │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │   │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘   │
//! │         │                │                                   │
//! │  ┌─────────────┐  ┌─────────────┐                            │
//! │  │ PolicyLayer │  │ StateStore  │                            │
//! │  └─────────────┘  └─────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tool calls travel inside model output as fenced ```` ```tool ```` blocks
//! (see [`protocol`]). Every call is checked by the [`policy`] layer before
//! the registry dispatches it.

pub mod context;
pub mod error;
pub mod policy;
pub mod protocol;
pub mod provider;
pub mod reasoning;
pub mod state;
pub mod tool;

pub use context::{AgentMode, CallContext, SessionId};
pub use error::{AgentError, Result};
pub use policy::{Policy, PolicyDecision, PolicyLayer};
pub use provider::{GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, AgentResponse, TurnStatus};
pub use state::{MemoryStateStore, StateStore, UserState};
pub use tool::{Tool, ToolInvocation, ToolOutcome, ToolParams, ToolRegistry, ToolSchema};
