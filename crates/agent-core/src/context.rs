//! Call Context
//!
//! Per-turn identity and mode information threaded through the reasoning
//! loop, policy checks and every tool execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::AgentError;

/// Operating mode of the agent.
///
/// The set is closed for a given release. Parsing an unknown mode is an
/// error, never a silent fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    /// Salaried or freelance individuals
    Individual,
    /// Small businesses and sole proprietors
    MicroBusiness,
    /// Assisting a practising accountant with client files
    AccountantAssist,
    /// Read-mostly review of an entity's compliance position
    ComplianceAudit,
}

impl AgentMode {
    pub const ALL: [AgentMode; 4] = [
        AgentMode::Individual,
        AgentMode::MicroBusiness,
        AgentMode::AccountantAssist,
        AgentMode::ComplianceAudit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Individual => "individual",
            AgentMode::MicroBusiness => "micro_business",
            AgentMode::AccountantAssist => "accountant_assist",
            AgentMode::ComplianceAudit => "compliance_audit",
        }
    }
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentMode {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        AgentMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| AgentError::InvalidMode(s.to_string()))
    }
}

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context for a single user turn.
///
/// Created once per incoming turn and never mutated afterwards. The
/// `with_*` helpers return a new context instead of editing in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallContext {
    /// Acting user
    pub user_id: String,

    /// Session the turn belongs to
    pub session_id: SessionId,

    /// Operating mode
    pub mode: AgentMode,

    /// Business entity under discussion, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Open key-value metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl CallContext {
    pub fn new(user_id: impl Into<String>, session_id: SessionId, mode: AgentMode) -> Self {
        Self {
            user_id: user_id.into(),
            session_id,
            mode,
            entity_id: None,
            created_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Derive a context scoped to a business entity
    pub fn with_entity(&self, entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            ..self.clone()
        }
    }

    /// Derive a context with one extra metadata entry
    pub fn with_metadata(&self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut derived = self.clone();
        derived.metadata.insert(key.into(), value);
        derived
    }

    /// Derive a context pinned to a specific timestamp
    pub fn at(&self, created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            ..self.clone()
        }
    }

    /// Boolean metadata lookup; absent or non-boolean values read as `false`
    pub fn flag(&self, key: &str) -> bool {
        self.metadata
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}
