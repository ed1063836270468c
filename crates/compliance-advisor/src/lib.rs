//! # compliance-advisor
//!
//! Tax compliance tools for Indian individuals and micro-businesses.
//!
//! ## Tools
//!
//! - **profile_collector**: stored tax profile, PAN/GSTIN checks
//! - **transaction_interpreter**: transaction categories, totals, GST rate hints
//! - **compliance_rule_engine**: GST, income tax, advance tax and TDS checks
//! - **calendar_tracker**: statutory due dates and overdue filings
//!
//! ## Thresholds (FY 2024-25)
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  GST registration (services)     ₹20,00,000 turnover        │
//! │  GST registration (goods)        ₹40,00,000 turnover        │
//! │  Advance tax                     ₹10,000 liability          │
//! │  TDS deduction                   ₹1,00,00,000 turnover      │
//! ├────────────────────────────────────────────────────────────┤
//! │  New regime slabs                                           │
//! │   0 - 3L    nil     │  10L - 12L  15%                       │
//! │   3L - 7L   5%      │  12L - 15L  20%                       │
//! │   7L - 10L  10%     │  above 15L  30%                       │
//! └────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use agent_core::{StateStore, ToolRegistry};

pub mod calendar;
pub mod error;
pub mod rules;
pub mod svckit;

pub use error::{AdvisorError, Result};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        CalendarTrackerTool, ComplianceRuleEngineTool, ProfileCollectorTool, TransactionInterpreterTool,
    };
}

/// Register every compliance tool
pub fn register_tools(registry: &mut ToolRegistry, state: Arc<dyn StateStore>) {
    registry.register(tools::ProfileCollectorTool::new(Arc::clone(&state)));
    registry.register(tools::TransactionInterpreterTool::new());
    registry.register(tools::ComplianceRuleEngineTool::new());
    registry.register(tools::CalendarTrackerTool::new(state));
}

/// Response guidelines for the compliance copilot
pub const COMPLIANCE_ADVISOR_PROMPT: &str = r#"## Working Rules

1. Use `profile_collector` before giving entity-specific advice if the profile is incomplete
2. Use `compliance_rule_engine` for any threshold, liability or registration question. Never estimate tax by hand.
3. Use `calendar_tracker` whenever dates or filings come up
4. Use `transaction_interpreter` to categorize bank entries before reasoning about them
5. Quote amounts in rupees with Indian digit grouping (₹25,00,000)
6. Flag every risk the tools report, highest severity first

RESPONSE FORMAT:
1. Acknowledge the user's query
2. If you need information, ask clearly
3. If using tools, explain why
4. Provide actionable advice
5. Flag any compliance risks
6. Suggest next steps

IMPORTANT DISCLAIMERS:
- You provide guidance, not legal/tax advice
- Complex cases need professional consultation
- Tax laws change; verify with official sources"#;
