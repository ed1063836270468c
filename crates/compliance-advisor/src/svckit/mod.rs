//! Service Kit - Agent Tools
//!
//! Domain-specific tools that implement `agent_core::Tool` for the
//! compliance advisor.

mod calendar_tracker;
mod compliance_rule_engine;
mod profile_collector;
mod transaction_interpreter;

pub use calendar_tracker::CalendarTrackerTool;
pub use compliance_rule_engine::ComplianceRuleEngineTool;
pub use profile_collector::ProfileCollectorTool;
pub use transaction_interpreter::{TransactionCategory, TransactionInterpreterTool};

use std::str::FromStr;

use agent_core::ToolParams;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::error::{AdvisorError, Result};

/// Largest amount a tool accepts (₹10^15). Keeps every rule computation
/// well inside `Decimal` range.
const MAX_AMOUNT: Decimal = dec!(1000000000000000);

fn str_param<'a>(params: &'a ToolParams, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

/// Rupee amount, either sign; missing or null reads as zero
fn signed_decimal_param(params: &ToolParams, key: &str) -> Result<Decimal> {
    let invalid = |value: &Value| AdvisorError::InvalidAmount {
        field: key.to_string(),
        value: value.to_string(),
    };

    let amount = match params.get(key) {
        None | Some(Value::Null) => return Ok(Decimal::ZERO),
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(|_| invalid(&Value::Number(n.clone())))?,
        Some(Value::String(s)) => Decimal::from_str(s.trim().replace(',', "").as_str())
            .map_err(|_| invalid(&Value::String(s.clone())))?,
        Some(other) => return Err(invalid(other)),
    };

    if amount.abs() > MAX_AMOUNT {
        return Err(AdvisorError::AmountTooLarge {
            field: key.to_string(),
            value: amount,
            limit: MAX_AMOUNT,
        });
    }
    Ok(amount)
}

/// Non-negative rupee amount; missing or null reads as zero
fn decimal_param(params: &ToolParams, key: &str) -> Result<Decimal> {
    let amount = signed_decimal_param(params, key)?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AdvisorError::NegativeAmount {
            field: key.to_string(),
            value: amount,
        });
    }
    Ok(amount)
}

/// Boolean read from the nested `profile` object, falling back to the top level
fn profile_flag(params: &ToolParams, key: &str) -> bool {
    params
        .get("profile")
        .and_then(|p| p.get(key))
        .or_else(|| params.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Amount read from the nested `profile` object, falling back to the top level
fn profile_amount(params: &ToolParams, key: &str) -> Result<Decimal> {
    match params.get("profile").and_then(Value::as_object) {
        Some(profile) if profile.contains_key(key) => decimal_param(profile, key),
        _ => decimal_param(params, key),
    }
}
