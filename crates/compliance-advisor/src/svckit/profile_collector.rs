//! Profile Collector Tool
//!
//! Reads the stored tax profile and validates PAN, GSTIN and entity type
//! before any update is accepted.

use std::sync::{Arc, LazyLock};

use agent_core::{
    state::{EntityType, StateStore},
    tool::{ParametersSchema, PropertySchema},
    CallContext, Result as CoreResult, Tool, ToolParams,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};

use super::str_param;
use crate::error::AdvisorError;

// `None` only if a pattern fails to compile
static PAN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").ok());

static GSTIN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").ok());

/// `ABCDE1234F`
pub fn is_valid_pan(pan: &str) -> bool {
    PAN.as_ref().is_some_and(|re| re.is_match(&pan.trim().to_uppercase()))
}

/// State code, PAN, entity number, `Z`, check character
pub fn is_valid_gstin(gstin: &str) -> bool {
    GSTIN.as_ref().is_some_and(|re| re.is_match(&gstin.trim().to_uppercase()))
}

/// Format errors found in profile data
fn validation_errors(data: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();

    if let Some(pan) = data.get("pan").and_then(Value::as_str) {
        if !is_valid_pan(pan) {
            errors.push("Invalid PAN format. Expected: ABCDE1234F".to_string());
        }
    }
    if let Some(gstin) = data.get("gstin").and_then(Value::as_str) {
        if !is_valid_gstin(gstin) {
            errors.push("Invalid GSTIN format".to_string());
        }
    }
    if let Some(entity_type) = data.get("entity_type") {
        if serde_json::from_value::<EntityType>(entity_type.clone()).is_err() {
            errors.push(format!("Unsupported entity type: {}", entity_type));
        }
    }
    if data.get("gstin").is_some() && data.get("gst_registered") == Some(&Value::Bool(false)) {
        errors.push("GSTIN given but gst_registered is false".to_string());
    }

    errors
}

/// Uppercase identifiers so stored values compare equal
fn normalized(mut data: Map<String, Value>) -> Map<String, Value> {
    for key in ["pan", "gstin"] {
        if let Some(Value::String(id)) = data.get_mut(key) {
            *id = id.trim().to_uppercase();
        }
    }
    data
}

/// Tool for reading and checking the user's tax profile
pub struct ProfileCollectorTool {
    state: Arc<dyn StateStore>,
}

impl ProfileCollectorTool {
    pub fn new(state: Arc<dyn StateStore>) -> Self {
        Self { state }
    }

    async fn get(&self, context: &CallContext) -> Result<Value, AdvisorError> {
        let state = self.state.get_user_state(&context.user_id).await?;

        let mut missing = Vec::new();
        if state.entities.is_empty() {
            missing.push("entity_type");
        }
        if !state.entities.iter().any(|e| e.tax_profile.pan.is_some()) {
            missing.push("pan");
        }

        let status = if missing.is_empty() { "complete" } else { "profile_needed" };

        Ok(json!({
            "status": status,
            "profile": state.profile,
            "entities": state.entities,
            "missing_fields": missing,
        }))
    }
}

#[async_trait]
impl Tool for ProfileCollectorTool {
    fn name(&self) -> &str {
        "profile_collector"
    }

    fn description(&self) -> &str {
        "Collect user tax profile information including PAN, GST status, income sources, and entity type"
    }

    fn parameters_schema(&self) -> ParametersSchema {
        ParametersSchema::object()
            .required(
                "action",
                PropertySchema::string("Action to perform").one_of(["get", "update", "validate"]),
            )
            .optional(
                "data",
                PropertySchema::object(
                    "Profile fields: pan, name, entity_type, gst_registered, gstin, \
                     annual_turnover_estimate, income_sources, state, financial_year",
                ),
            )
    }

    fn category(&self) -> &str {
        "profile"
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    async fn execute(&self, params: &ToolParams, context: &CallContext) -> CoreResult<Value> {
        let action = str_param(params, "action").unwrap_or_default();
        let data = params
            .get("data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match action {
            "get" => Ok(self.get(context).await?),
            "validate" => {
                let errors = validation_errors(&data);
                Ok(json!({ "valid": errors.is_empty(), "errors": errors }))
            }
            "update" => {
                let errors = validation_errors(&data);
                if !errors.is_empty() {
                    return Err(AdvisorError::InvalidProfile(errors.join("; ")).into());
                }
                tracing::info!(user = %context.user_id, fields = data.len(), "Profile update accepted");
                Ok(json!({ "status": "updated", "profile": normalized(data) }))
            }
            other => Err(AdvisorError::UnknownAction(other.to_string()).into()),
        }
    }
}
