//! Filing Calendar
//!
//! Recurring statutory due dates and their next occurrence from a given day.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frequency {
    /// Every month on `day`
    Monthly { day: u32 },
    /// On `day` of each listed month
    Quarterly { months: [u32; 4], day: u32 },
    /// Once a year
    Yearly { month: u32, day: u32 },
}

/// A recurring due date
#[derive(Clone, Copy, Debug)]
pub struct DeadlineRule {
    pub key: &'static str,
    pub description: &'static str,
    pub frequency: Frequency,
}

/// Standard schedule. Days past the end of a month fall on its last day.
pub static DEADLINES: [DeadlineRule; 10] = [
    DeadlineRule {
        key: "gstr1",
        description: "GSTR-1 (Outward supplies)",
        frequency: Frequency::Monthly { day: 11 },
    },
    DeadlineRule {
        key: "gstr3b",
        description: "GSTR-3B (Summary return)",
        frequency: Frequency::Monthly { day: 20 },
    },
    DeadlineRule {
        key: "tds_payment",
        description: "TDS payment for previous month",
        frequency: Frequency::Monthly { day: 7 },
    },
    DeadlineRule {
        key: "tds_return",
        description: "TDS return (quarterly)",
        frequency: Frequency::Quarterly { months: [1, 5, 7, 10], day: 31 },
    },
    DeadlineRule {
        key: "advance_tax_q1",
        description: "Advance Tax Q1 (15%)",
        frequency: Frequency::Yearly { month: 6, day: 15 },
    },
    DeadlineRule {
        key: "advance_tax_q2",
        description: "Advance Tax Q2 (45%)",
        frequency: Frequency::Yearly { month: 9, day: 15 },
    },
    DeadlineRule {
        key: "advance_tax_q3",
        description: "Advance Tax Q3 (75%)",
        frequency: Frequency::Yearly { month: 12, day: 15 },
    },
    DeadlineRule {
        key: "advance_tax_q4",
        description: "Advance Tax Q4 (100%)",
        frequency: Frequency::Yearly { month: 3, day: 15 },
    },
    DeadlineRule {
        key: "itr_individual",
        description: "ITR filing (non-audit)",
        frequency: Frequency::Yearly { month: 7, day: 31 },
    },
    DeadlineRule {
        key: "itr_audit",
        description: "ITR filing (audit cases)",
        frequency: Frequency::Yearly { month: 10, day: 31 },
    },
];

/// Deadline families accepted by `deadline_type`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineFamily {
    Gst,
    IncomeTax,
    Tds,
    AdvanceTax,
    All,
}

impl DeadlineFamily {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gst" => Some(Self::Gst),
            "income_tax" => Some(Self::IncomeTax),
            "tds" => Some(Self::Tds),
            "advance_tax" => Some(Self::AdvanceTax),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn includes(self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Gst => is_gst(key),
            Self::IncomeTax => key.starts_with("itr"),
            Self::Tds => key.starts_with("tds"),
            Self::AdvanceTax => key.starts_with("advance_tax"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn from_days(days_until: i64) -> Self {
        match days_until {
            ..=3 => Self::High,
            4..=7 => Self::Medium,
            _ => Self::Low,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpcomingDeadline {
    pub deadline: String,
    pub description: String,
    pub date: NaiveDate,
    pub days_until: i64,
    pub urgency: Urgency,
}

fn is_gst(key: &str) -> bool {
    key.starts_with("gst")
}

/// `day` of the month, clamped to the month's last day
fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    (28..=day.max(28))
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(year, month, d.min(day)))
}

fn month_after(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

/// First due date on or after `today`
pub fn next_occurrence(frequency: Frequency, today: NaiveDate) -> Result<NaiveDate> {
    let (year, month) = (today.year(), today.month());

    let candidates: Vec<Option<NaiveDate>> = match frequency {
        Frequency::Monthly { day } => {
            let (next_year, next_month) = month_after(year, month);
            vec![clamped_date(year, month, day), clamped_date(next_year, next_month, day)]
        }
        Frequency::Quarterly { months, day } => [year, year + 1]
            .iter()
            .flat_map(|&y| months.iter().map(move |&m| clamped_date(y, m, day)))
            .collect(),
        Frequency::Yearly { month: m, day } => {
            vec![clamped_date(year, m, day), clamped_date(year + 1, m, day)]
        }
    };

    candidates
        .into_iter()
        .flatten()
        .filter(|date| *date >= today)
        .min()
        .ok_or_else(|| AdvisorError::DateOutOfRange(today.to_string()))
}

/// Deadlines falling within `days_ahead` of `today`, soonest first.
/// GST returns are skipped unless the user is GST registered.
pub fn upcoming(
    today: NaiveDate,
    days_ahead: u64,
    family: DeadlineFamily,
    gst_registered: bool,
) -> Result<Vec<UpcomingDeadline>> {
    let end = today
        .checked_add_days(Days::new(days_ahead))
        .ok_or_else(|| AdvisorError::DateOutOfRange(format!("{today} + {days_ahead} days")))?;
    let mut found = Vec::new();

    for rule in DEADLINES.iter().filter(|r| family.includes(r.key)) {
        if is_gst(rule.key) && !gst_registered {
            continue;
        }

        let date = next_occurrence(rule.frequency, today)?;
        if date <= end {
            let days_until = (date - today).num_days();
            found.push(UpcomingDeadline {
                deadline: rule.key.to_string(),
                description: rule.description.to_string(),
                date,
                days_until,
                urgency: Urgency::from_days(days_until),
            });
        }
    }

    found.sort_by_key(|d| d.days_until);
    Ok(found)
}

pub fn find_rule(key: &str) -> Option<&'static DeadlineRule> {
    DEADLINES.iter().find(|r| r.key == key)
}
