//! Compliance Rule Engine Tool
//!
//! Runs the FY 2024-25 GST, income tax, advance tax and TDS checks.

use agent_core::{
    tool::{ParametersSchema, PropertySchema},
    CallContext, Result as CoreResult, Tool, ToolParams,
};
use async_trait::async_trait;
use serde_json::Value;

use super::{decimal_param, profile_amount, profile_flag, str_param};
use crate::error::{AdvisorError, Result};
use crate::rules::{self, CheckInput};

const CHECK_TYPES: [&str; 5] = ["gst_registration", "income_tax", "advance_tax", "tds", "all"];

/// Tool for checking compliance status against Indian tax rules
#[derive(Default)]
pub struct ComplianceRuleEngineTool;

impl ComplianceRuleEngineTool {
    pub fn new() -> Self {
        Self
    }

    fn input(params: &ToolParams) -> Result<CheckInput> {
        Ok(CheckInput {
            turnover: decimal_param(params, "turnover")?,
            income: decimal_param(params, "income")?,
            gst_registered: profile_flag(params, "gst_registered"),
            deals_in_goods: profile_flag(params, "deals_in_goods"),
            estimated_deductions: profile_amount(params, "estimated_deductions")?,
        })
    }

    fn run_check(check_type: &str, input: &CheckInput) -> Result<Value> {
        let value = match check_type {
            "gst_registration" => serde_json::to_value(rules::check_gst(input))?,
            "income_tax" => serde_json::to_value(rules::check_income_tax(input))?,
            "advance_tax" => serde_json::to_value(rules::check_advance_tax(input))?,
            "tds" => serde_json::to_value(rules::check_tds(input))?,
            "all" => serde_json::to_value(rules::check_all(input))?,
            other => return Err(AdvisorError::UnknownCheck(other.to_string())),
        };
        Ok(value)
    }
}

#[async_trait]
impl Tool for ComplianceRuleEngineTool {
    fn name(&self) -> &str {
        "compliance_rule_engine"
    }

    fn description(&self) -> &str {
        "Check compliance status for GST, Income Tax, TDS and identify risks"
    }

    fn parameters_schema(&self) -> ParametersSchema {
        ParametersSchema::object()
            .required(
                "check_type",
                PropertySchema::string("Which check to run").one_of(CHECK_TYPES),
            )
            .optional("turnover", PropertySchema::number("Annual turnover in rupees"))
            .optional("income", PropertySchema::number("Annual taxable income in rupees"))
            .optional(
                "profile",
                PropertySchema::object("gst_registered, deals_in_goods, estimated_deductions"),
            )
            .optional("financial_year", PropertySchema::string("FY in format 2024-25"))
    }

    fn category(&self) -> &str {
        "compliance"
    }

    async fn execute(&self, params: &ToolParams, context: &CallContext) -> CoreResult<Value> {
        let check_type = str_param(params, "check_type").unwrap_or_default();
        let input = Self::input(params)?;

        tracing::debug!(check_type, user = %context.user_id, "Running compliance check");

        Ok(Self::run_check(check_type, &input)?)
    }
}
