//! State Access
//!
//! The narrow read/write surface the reasoning loop needs from persistent
//! storage, plus an in-memory store for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::context::SessionId;
use crate::error::{AgentError, Result};

/// Most recent turns returned in a [`UserState`]
pub const HISTORY_LIMIT: usize = 20;

/// How far ahead deadlines count as upcoming
pub const UPCOMING_DEADLINE_DAYS: i64 = 30;

/// User account information
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Individual,
    Huf,
    Proprietorship,
    Partnership,
    Llp,
    #[serde(rename = "pvt_ltd")]
    PrivateLimited,
}

/// Tax registration details of an entity
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan: Option<String>,
    #[serde(default)]
    pub gst_registered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
}

/// A business or individual the user files for
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    #[serde(skip_serializing, default)]
    pub user_id: String,
    pub name: String,
    pub entity_type: EntityType,
    #[serde(default)]
    pub tax_profile: TaxProfile,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Compliance risk detected for an entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRisk {
    pub risk_id: String,
    pub entity_id: String,
    pub category: String,
    pub severity: RiskSeverity,
    pub title: String,
    pub detected_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    Pending,
    Completed,
    Overdue,
    Extended,
}

/// A filing deadline for an entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deadline {
    pub deadline_id: String,
    pub entity_id: String,
    pub deadline_type: String,
    pub due_date: DateTime<Utc>,
    pub status: DeadlineStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub entity: String,
    pub title: String,
    pub severity: RiskSeverity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeadlineSummary {
    pub entity: String,
    #[serde(rename = "type")]
    pub deadline_type: String,
    pub due: DateTime<Utc>,
}

/// One persisted user turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub turn_id: String,
    pub session_id: SessionId,
    pub user_id: String,
    pub user_message: String,
    pub assistant_message: String,
    /// Names of the tools dispatched during the turn
    #[serde(default)]
    pub tool_calls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregated snapshot the loop builds its transcript from
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    pub profile: Option<UserProfile>,
    pub entities: Vec<Entity>,
    pub active_risks: Vec<RiskSummary>,
    /// Pending and due within 30 days, soonest first
    pub upcoming_deadlines: Vec<DeadlineSummary>,
    /// Oldest first, bounded by the store
    pub conversation_history: Vec<ConversationEntry>,
}

/// Persistence collaborator used by the reasoning loop
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Aggregated state for one user
    async fn get_user_state(&self, user_id: &str) -> Result<UserState>;

    /// Append a finished turn to a session's log
    async fn record_turn(&self, session_id: &SessionId, entry: ConversationEntry) -> Result<()>;
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, UserProfile>,
    entities: Vec<Entity>,
    risks: Vec<ComplianceRisk>,
    deadlines: Vec<Deadline>,
    turns: Vec<ConversationEntry>,
}

/// In-memory state store (for development/testing)
#[derive(Default)]
pub struct MemoryStateStore {
    state: RwLock<MemoryState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_user(&self, profile: UserProfile) {
        let mut state = self.state.write().await;
        state.users.insert(profile.user_id.clone(), profile);
    }

    pub async fn add_entity(&self, entity: Entity) {
        let mut state = self.state.write().await;
        state.entities.retain(|e| e.entity_id != entity.entity_id);
        state.entities.push(entity);
    }

    pub async fn add_risk(&self, risk: ComplianceRisk) {
        self.state.write().await.risks.push(risk);
    }

    pub async fn resolve_risk(&self, risk_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let risk = state
            .risks
            .iter_mut()
            .find(|r| r.risk_id == risk_id)
            .ok_or_else(|| AgentError::State(format!("unknown risk: {}", risk_id)))?;
        risk.resolved_at = Some(Utc::now());
        Ok(())
    }

    pub async fn add_deadline(&self, deadline: Deadline) {
        self.state.write().await.deadlines.push(deadline);
    }

    /// All turns recorded for a session, oldest first
    pub async fn session_history(&self, session_id: &SessionId) -> Vec<ConversationEntry> {
        let state = self.state.read().await;
        state
            .turns
            .iter()
            .filter(|t| &t.session_id == session_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_user_state(&self, user_id: &str) -> Result<UserState> {
        let state = self.state.read().await;
        let cutoff = Utc::now() + Duration::days(UPCOMING_DEADLINE_DAYS);

        let entities: Vec<Entity> = state
            .entities
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();

        let mut active_risks = Vec::new();
        let mut upcoming_deadlines = Vec::new();

        for entity in &entities {
            active_risks.extend(
                state
                    .risks
                    .iter()
                    .filter(|r| r.entity_id == entity.entity_id && r.resolved_at.is_none())
                    .map(|r| RiskSummary {
                        entity: entity.name.clone(),
                        title: r.title.clone(),
                        severity: r.severity,
                    }),
            );

            upcoming_deadlines.extend(
                state
                    .deadlines
                    .iter()
                    .filter(|d| {
                        d.entity_id == entity.entity_id
                            && d.status == DeadlineStatus::Pending
                            && d.due_date <= cutoff
                    })
                    .map(|d| DeadlineSummary {
                        entity: entity.name.clone(),
                        deadline_type: d.deadline_type.clone(),
                        due: d.due_date,
                    }),
            );
        }

        upcoming_deadlines.sort_by_key(|d| d.due);

        let history: Vec<&ConversationEntry> =
            state.turns.iter().filter(|t| t.user_id == user_id).collect();
        let skip = history.len().saturating_sub(HISTORY_LIMIT);

        Ok(UserState {
            profile: state.users.get(user_id).cloned(),
            entities,
            active_risks,
            upcoming_deadlines,
            conversation_history: history.into_iter().skip(skip).cloned().collect(),
        })
    }

    async fn record_turn(&self, session_id: &SessionId, entry: ConversationEntry) -> Result<()> {
        if &entry.session_id != session_id {
            return Err(AgentError::State(format!(
                "turn {} belongs to session {}, not {}",
                entry.turn_id, entry.session_id, session_id
            )));
        }

        self.state.write().await.turns.push(entry);
        Ok(())
    }
}
