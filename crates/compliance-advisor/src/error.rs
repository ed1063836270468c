//! Error Types for Compliance Advisor

use agent_core::AgentError;
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown check type: {0}")]
    UnknownCheck(String),

    #[error("Unknown deadline type: {0}")]
    UnknownDeadline(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid amount for {field}: {value}")]
    InvalidAmount { field: String, value: String },

    #[error("Negative amount for {field}: {value}")]
    NegativeAmount { field: String, value: Decimal },

    #[error("Amount for {field} exceeds {limit}: {value}")]
    AmountTooLarge { field: String, value: Decimal, limit: Decimal },

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    #[error("State unavailable: {0}")]
    State(#[from] AgentError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Tool failures surface to the agent as execution errors
impl From<AdvisorError> for AgentError {
    fn from(err: AdvisorError) -> Self {
        AgentError::ToolExecution(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_tool_execution() {
        let err: AgentError = AdvisorError::UnknownAction("delete".into()).into();
        assert!(matches!(err, AgentError::ToolExecution(_)));
        assert_eq!(err.to_string(), "Unknown action: delete");
    }
}
