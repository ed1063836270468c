//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool not found in registry
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// Tool parameters rejected by `Tool::validate_params`
    #[error("{0}")]
    ToolValidation(String),

    /// Tool execution failed. The message is surfaced verbatim in the outcome.
    #[error("{0}")]
    ToolExecution(String),

    /// Operating mode string not in the known set
    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    /// Parse error (e.g., structured generation output)
    #[error("Parse error: {0}")]
    Parse(String),

    /// State store error
    #[error("State error: {0}")]
    State(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Shorthand for the error kind tools raise from `execute`
    pub fn tool(msg: impl Into<String>) -> Self {
        AgentError::ToolExecution(msg.into())
    }

    /// Transient failures worth another attempt later
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::ProviderUnavailable(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(msg) => format!("The AI service encountered an error: {}", msg),
            AgentError::ProviderUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            AgentError::ToolNotFound(name) => format!("The tool '{}' is not available.", name),
            AgentError::ToolValidation(msg) => format!("Invalid tool input: {}", msg),
            AgentError::ToolExecution(msg) => format!("Tool error: {}", msg),
            AgentError::InvalidMode(mode) => format!("'{}' is not a supported mode.", mode),
            AgentError::State(_) => "Your saved data could not be loaded. Please try again.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_errors_display_verbatim() {
        assert_eq!(AgentError::tool("disk on fire").to_string(), "disk on fire");
        assert_eq!(
            AgentError::ToolNotFound("ghost".into()).to_string(),
            "Unknown tool: ghost"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(AgentError::ProviderUnavailable("down".into()).is_retryable());
        assert!(!AgentError::Provider("bad request".into()).is_retryable());
        assert!(!AgentError::ToolValidation("Missing required field: action".into()).is_retryable());
    }

    #[test]
    fn test_validation_message() {
        let err = AgentError::ToolValidation("Missing required field: action".into());
        assert_eq!(err.to_string(), "Missing required field: action");
        assert_eq!(err.user_message(), "Invalid tool input: Missing required field: action");
    }
}
