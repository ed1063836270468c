//! Transaction Interpreter Tool
//!
//! Keyword categorization of bank and ledger entries, per-category totals,
//! and a first-cut GST rate for a described supply.

use std::collections::BTreeMap;

use agent_core::{
    tool::{ParametersSchema, PropertySchema},
    CallContext, Result as CoreResult, Tool, ToolParams,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{signed_decimal_param, str_param};
use crate::error::{AdvisorError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    Salary,
    RentReceived,
    RentPaid,
    ProfessionalIncome,
    GstPayment,
    Tds,
    Investment,
    InterestIncome,
    Utility,
    BusinessExpense,
    Uncategorized,
}

impl TransactionCategory {
    /// Utility bills carry no tax consequence; everything else might
    pub fn is_tax_relevant(self) -> bool {
        self != TransactionCategory::Utility
    }
}

/// Checked in order, first match wins
const PATTERNS: [(TransactionCategory, &[&str]); 10] = [
    (TransactionCategory::Salary, &["salary", "sal cr", "payroll", "wages"]),
    (TransactionCategory::RentReceived, &["rent received", "rental income"]),
    (TransactionCategory::RentPaid, &["rent paid", "house rent", "office rent"]),
    (TransactionCategory::ProfessionalIncome, &["professional fees", "consulting", "freelance"]),
    (TransactionCategory::GstPayment, &["gst", "cgst", "sgst", "igst"]),
    (TransactionCategory::Tds, &["tds", "tax deducted"]),
    (TransactionCategory::Investment, &["mutual fund", "mf purchase", "sip", "stocks", "equity"]),
    (TransactionCategory::InterestIncome, &["interest", "fd interest", "savings interest"]),
    (TransactionCategory::Utility, &["electricity", "water bill", "internet", "phone bill"]),
    (TransactionCategory::BusinessExpense, &["office supplies", "business expense", "travel"]),
];

const MATCH_CONFIDENCE: f64 = 0.8;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Categorization {
    pub category: TransactionCategory,
    pub confidence: f64,
    pub tax_relevant: bool,
}

/// Category for a free-text transaction description
pub fn categorize(description: &str) -> Categorization {
    let description = description.to_lowercase();

    let category = PATTERNS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| description.contains(k)))
        .map(|(category, _)| *category);

    match category {
        Some(category) => Categorization {
            category,
            confidence: MATCH_CONFIDENCE,
            tax_relevant: category.is_tax_relevant(),
        },
        None => Categorization {
            category: TransactionCategory::Uncategorized,
            confidence: 0.0,
            tax_relevant: true,
        },
    }
}

/// Each transaction object with its categorization merged in
fn categorize_batch(transactions: &[Value]) -> Result<Vec<Value>> {
    transactions
        .iter()
        .map(|txn| {
            let mut entry = txn.as_object().cloned().unwrap_or_default();
            let description = str_param(&entry, "description").unwrap_or_default();
            if let Value::Object(found) = serde_json::to_value(categorize(description))? {
                entry.extend(found);
            }
            Ok(Value::Object(entry))
        })
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub count: usize,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatternSummary {
    pub summary: BTreeMap<TransactionCategory, CategoryTotal>,
    pub total_transactions: usize,
}

/// Count and amount per category
pub fn analyze_patterns(transactions: &[Value]) -> Result<PatternSummary> {
    let mut summary: BTreeMap<TransactionCategory, CategoryTotal> = BTreeMap::new();

    for txn in transactions {
        let entry = txn.as_object().cloned().unwrap_or_default();
        let category = categorize(str_param(&entry, "description").unwrap_or_default()).category;
        let amount = signed_decimal_param(&entry, "amount")?;

        let bucket = summary.entry(category).or_default();
        bucket.count += 1;
        bucket.total += amount;
    }

    Ok(PatternSummary {
        summary,
        total_transactions: transactions.len(),
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GstTreatment {
    ZeroRated,
    Service,
    Standard,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GstSuggestion {
    pub gst_rate: u8,
    #[serde(rename = "type")]
    pub treatment: GstTreatment,
    pub note: &'static str,
}

fn mentions(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Rough GST rate for a described supply. Always worth verifying.
pub fn suggest_gst(description: &str) -> GstSuggestion {
    let description = description.to_lowercase();

    if mentions(&description, &["export", "foreign"]) {
        GstSuggestion { gst_rate: 0, treatment: GstTreatment::ZeroRated, note: "Exports are zero-rated" }
    } else if mentions(&description, &["software", "consulting", "professional"]) {
        GstSuggestion { gst_rate: 18, treatment: GstTreatment::Service, note: "Standard service rate" }
    } else if mentions(&description, &["food", "restaurant"]) {
        GstSuggestion { gst_rate: 5, treatment: GstTreatment::Service, note: "Restaurant services" }
    } else {
        GstSuggestion {
            gst_rate: 18,
            treatment: GstTreatment::Standard,
            note: "Default rate, verify for specific item",
        }
    }
}

/// Tool for categorizing transactions for tax classification
#[derive(Default)]
pub struct TransactionInterpreterTool;

impl TransactionInterpreterTool {
    pub fn new() -> Self {
        Self
    }

    fn transactions(params: &ToolParams) -> &[Value] {
        params
            .get("transactions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn run(params: &ToolParams) -> Result<Value> {
        let action = str_param(params, "action").unwrap_or_default();

        let value = match action {
            "categorize" => match (str_param(params, "description"), params.get("transactions")) {
                (Some(description), _) => serde_json::to_value(categorize(description))?,
                (None, Some(_)) => Value::Array(categorize_batch(Self::transactions(params))?),
                (None, None) => {
                    return Err(AdvisorError::MissingInput("description or transactions".into()))
                }
            },
            "analyze_pattern" => serde_json::to_value(analyze_patterns(Self::transactions(params))?)?,
            "suggest_gst" => {
                serde_json::to_value(suggest_gst(str_param(params, "description").unwrap_or_default()))?
            }
            other => return Err(AdvisorError::UnknownAction(other.to_string())),
        };
        Ok(value)
    }
}

#[async_trait]
impl Tool for TransactionInterpreterTool {
    fn name(&self) -> &str {
        "transaction_interpreter"
    }

    fn description(&self) -> &str {
        "Parse and categorize financial transactions for tax classification"
    }

    fn parameters_schema(&self) -> ParametersSchema {
        ParametersSchema::object()
            .required(
                "action",
                PropertySchema::string("What to do")
                    .one_of(["categorize", "analyze_pattern", "suggest_gst"]),
            )
            .optional(
                "transactions",
                PropertySchema::array("Entries with date, description, amount and type (credit or debit)"),
            )
            .optional(
                "description",
                PropertySchema::string("Single transaction description to categorize"),
            )
    }

    fn category(&self) -> &str {
        "transactions"
    }

    async fn execute(&self, params: &ToolParams, context: &CallContext) -> CoreResult<Value> {
        tracing::debug!(
            user = %context.user_id,
            transactions = Self::transactions(params).len(),
            "Interpreting transactions"
        );
        Ok(Self::run(params)?)
    }
}
