//! Calendar Tracker Tool
//!
//! Upcoming statutory deadlines and overdue filings. "Today" is the date the
//! call context was created, so the same context always sees the same dates.

use std::sync::Arc;

use agent_core::{
    state::StateStore,
    tool::{ParametersSchema, PropertySchema},
    CallContext, Result as CoreResult, Tool, ToolParams,
};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{profile_flag, str_param};
use crate::calendar::{self, DeadlineFamily};
use crate::error::{AdvisorError, Result};

const DEFAULT_DAYS_AHEAD: i64 = 30;

/// Tool for tracking tax compliance deadlines
pub struct CalendarTrackerTool {
    state: Arc<dyn StateStore>,
}

impl CalendarTrackerTool {
    pub fn new(state: Arc<dyn StateStore>) -> Self {
        Self { state }
    }

    fn get_upcoming(params: &ToolParams, context: &CallContext) -> Result<Value> {
        let family_name = str_param(params, "deadline_type").unwrap_or("all");
        let family = DeadlineFamily::parse(family_name)
            .ok_or_else(|| AdvisorError::UnknownDeadline(family_name.to_string()))?;
        let days_ahead = params
            .get("days_ahead")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_DAYS_AHEAD)
            .max(0)
            .unsigned_abs();

        let today = context.created_at.date_naive();
        let deadlines = calendar::upcoming(today, days_ahead, family, profile_flag(params, "gst_registered"))?;

        Ok(serde_json::to_value(deadlines)?)
    }

    /// Pending deadlines on record whose due date has passed
    async fn get_overdue(&self, context: &CallContext) -> Result<Value> {
        let state = self.state.get_user_state(&context.user_id).await?;

        let overdue: Vec<Value> = state
            .upcoming_deadlines
            .iter()
            .filter(|d| d.due < context.created_at)
            .map(|d| {
                json!({
                    "entity": d.entity,
                    "deadline": d.deadline_type,
                    "due": d.due.date_naive(),
                    "days_overdue": (context.created_at - d.due).num_days(),
                })
            })
            .collect();

        Ok(Value::Array(overdue))
    }

    fn check_deadline(params: &ToolParams, context: &CallContext) -> Result<Value> {
        let key = str_param(params, "deadline_type").unwrap_or_default();
        let rule = calendar::find_rule(key)
            .ok_or_else(|| AdvisorError::UnknownDeadline(key.to_string()))?;

        let today = context.created_at.date_naive();
        let next = calendar::next_occurrence(rule.frequency, today)?;

        Ok(json!({
            "deadline": rule.key,
            "description": rule.description,
            "next_date": next,
            "days_until": (next - today).num_days(),
        }))
    }
}

#[async_trait]
impl Tool for CalendarTrackerTool {
    fn name(&self) -> &str {
        "calendar_tracker"
    }

    fn description(&self) -> &str {
        "Track and manage tax compliance deadlines for GST, Income Tax, TDS"
    }

    fn parameters_schema(&self) -> ParametersSchema {
        ParametersSchema::object()
            .required(
                "action",
                PropertySchema::string("What to look up")
                    .one_of(["get_upcoming", "get_overdue", "check_deadline"]),
            )
            .optional(
                "deadline_type",
                PropertySchema::string(
                    "Family for get_upcoming (gst, income_tax, tds, advance_tax, all) \
                     or a specific deadline for check_deadline (e.g. gstr3b, itr_individual)",
                )
                .with_default(json!("all")),
            )
            .optional(
                "days_ahead",
                PropertySchema::integer("Look-ahead window in days").with_default(json!(DEFAULT_DAYS_AHEAD)),
            )
            .optional("profile", PropertySchema::object("gst_registered flag"))
    }

    fn category(&self) -> &str {
        "calendar"
    }

    async fn execute(&self, params: &ToolParams, context: &CallContext) -> CoreResult<Value> {
        let result = match str_param(params, "action").unwrap_or_default() {
            "get_upcoming" => Self::get_upcoming(params, context),
            "get_overdue" => self.get_overdue(context).await,
            "check_deadline" => Self::check_deadline(params, context),
            other => Err(AdvisorError::UnknownAction(other.to_string())),
        };
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{
        state::{Deadline, DeadlineStatus, Entity, EntityType, TaxProfile},
        AgentMode, MemoryStateStore, SessionId, ToolInvocation, ToolRegistry,
    };
    use chrono::{Duration, TimeZone, Utc};

    fn context() -> CallContext {
        CallContext::new("u1", SessionId::from_string("s1"), AgentMode::MicroBusiness)
            .at(Utc.with_ymd_and_hms(2024, 6, 5, 9, 0, 0).unwrap())
    }

    fn params(value: Value) -> ToolParams {
        value.as_object().cloned().unwrap()
    }

    fn tool() -> CalendarTrackerTool {
        CalendarTrackerTool::new(Arc::new(MemoryStateStore::new()))
    }

    #[tokio::test]
    async fn test_upcoming_uses_context_date() {
        let result = tool()
            .execute(
                &params(json!({"action": "get_upcoming", "profile": {"gst_registered": true}})),
                &context(),
            )
            .await
            .unwrap();

        let list = result.as_array().unwrap();
        assert_eq!(list[0]["deadline"], json!("tds_payment"));
        assert_eq!(list[0]["date"], json!("2024-06-07"));
        assert_eq!(list[0]["urgency"], json!("high"));
        assert!(list.iter().any(|d| d["deadline"] == json!("gstr3b")));
    }

    #[tokio::test]
    async fn test_same_context_same_answer() {
        let p = params(json!({"action": "get_upcoming", "days_ahead": 120}));
        let first = tool().execute(&p, &context()).await.unwrap();
        let second = tool().execute(&p, &context()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_check_deadline() {
        let result = tool()
            .execute(
                &params(json!({"action": "check_deadline", "deadline_type": "itr_individual"})),
                &context(),
            )
            .await
            .unwrap();

        assert_eq!(result["next_date"], json!("2024-07-31"));
        assert_eq!(result["days_until"], json!(56));

        let err = tool()
            .execute(&params(json!({"action": "check_deadline", "deadline_type": "gst"})), &context())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown deadline type: gst");
    }

    #[tokio::test]
    async fn test_huge_window_fails_the_call_only() {
        let mut registry = ToolRegistry::new();
        registry.register(tool());

        let call = ToolInvocation::new(
            "calendar_tracker",
            params(json!({"action": "get_upcoming", "days_ahead": 1_000_000_000})),
        );
        let outcome = registry.dispatch(&call, &context()).await;

        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().starts_with("Date out of range"));
    }

    #[tokio::test]
    async fn test_overdue_from_stored_deadlines() {
        let store = Arc::new(MemoryStateStore::new());
        store
            .add_entity(Entity {
                entity_id: "e1".into(),
                user_id: "u1".into(),
                name: "Asha Designs".into(),
                entity_type: EntityType::Proprietorship,
                tax_profile: TaxProfile::default(),
                is_primary: true,
            })
            .await;
        store
            .add_deadline(Deadline {
                deadline_id: "d1".into(),
                entity_id: "e1".into(),
                deadline_type: "gstr3b".into(),
                due_date: Utc::now() - Duration::days(3),
                status: DeadlineStatus::Pending,
            })
            .await;
        store
            .add_deadline(Deadline {
                deadline_id: "d2".into(),
                entity_id: "e1".into(),
                deadline_type: "gstr1".into(),
                due_date: Utc::now() + Duration::days(3),
                status: DeadlineStatus::Pending,
            })
            .await;

        let tool = CalendarTrackerTool::new(store);
        let now = CallContext::new("u1", SessionId::from_string("s1"), AgentMode::MicroBusiness);
        let result = tool.execute(&params(json!({"action": "get_overdue"})), &now).await.unwrap();

        let list = result.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["deadline"], json!("gstr3b"));
        assert_eq!(list[0]["days_overdue"], json!(3));
    }
}
