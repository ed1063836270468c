//! Compliance Rules
//!
//! FY 2024-25 thresholds and checks for GST, income tax, advance tax and TDS.
//! All amounts are rupees held as `Decimal`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// GST registration threshold for service providers
pub const GST_REGISTRATION_THRESHOLD: Decimal = dec!(2000000);

/// GST registration threshold for suppliers of goods
pub const GST_REGISTRATION_THRESHOLD_GOODS: Decimal = dec!(4000000);

/// Tax liability above which advance tax is payable
pub const ADVANCE_TAX_THRESHOLD: Decimal = dec!(10000);

/// Turnover above which TDS must be deducted on payments
pub const TDS_DEDUCTION_THRESHOLD: Decimal = dec!(10000000);

/// Basic exemption limit under the new regime
pub const BASIC_EXEMPTION: Decimal = dec!(300000);

/// Deductions above which the old regime is usually better
pub const OLD_REGIME_DEDUCTION_HINT: Decimal = dec!(150000);

/// (lower bound, rate, tax accumulated below the bound)
const NEW_REGIME_SLABS: [(Decimal, Decimal, Decimal); 5] = [
    (dec!(1500000), dec!(0.30), dec!(140000)),
    (dec!(1200000), dec!(0.20), dec!(80000)),
    (dec!(1000000), dec!(0.15), dec!(50000)),
    (dec!(700000), dec!(0.10), dec!(20000)),
    (dec!(300000), dec!(0.05), dec!(0)),
];

/// Cumulative advance tax installments: (due date, percent of liability)
pub const ADVANCE_TAX_INSTALLMENTS: [(&str, u8); 4] = [
    ("June 15", 15),
    ("September 15", 45),
    ("December 15", 75),
    ("March 15", 100),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    OldRegime,
    NewRegime,
}

/// Inputs shared by every check
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckInput {
    #[serde(default)]
    pub turnover: Decimal,
    #[serde(default)]
    pub income: Decimal,
    #[serde(default)]
    pub gst_registered: bool,
    #[serde(default)]
    pub deals_in_goods: bool,
    #[serde(default)]
    pub estimated_deductions: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub severity: String,
    pub issue: String,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GstCheck {
    pub status: ComplianceStatus,
    pub threshold: Decimal,
    pub risks: Vec<RiskFinding>,
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncomeTaxCheck {
    pub status: ComplianceStatus,
    pub filing_required: bool,
    pub estimated_tax: Decimal,
    pub tax_regime_suggestion: Option<TaxRegime>,
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub date: String,
    pub percentage: u8,
    pub cumulative_amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdvanceTaxCheck {
    pub required: bool,
    pub estimated_tax: Decimal,
    pub deadlines: Vec<Installment>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TdsCheck {
    pub tds_deduction_required: bool,
    pub tds_applicable_on_receipts: bool,
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FullCheck {
    pub gst: GstCheck,
    pub income_tax: IncomeTaxCheck,
    pub advance_tax: AdvanceTaxCheck,
    pub tds: TdsCheck,
}

/// Income tax under the new regime, FY 2024-25 slabs, rounded to the rupee
pub fn new_regime_tax(income: Decimal) -> Decimal {
    NEW_REGIME_SLABS
        .iter()
        .find(|&&(lower, _, _)| income > lower)
        .map_or(Decimal::ZERO, |&(lower, rate, base)| {
            (base + (income - lower) * rate).round_dp(0)
        })
}

pub fn check_gst(input: &CheckInput) -> GstCheck {
    let threshold = if input.deals_in_goods {
        GST_REGISTRATION_THRESHOLD_GOODS
    } else {
        GST_REGISTRATION_THRESHOLD
    };

    let mut check = GstCheck {
        status: ComplianceStatus::Compliant,
        threshold,
        risks: Vec::new(),
        recommendations: Vec::new(),
    };

    if input.turnover > threshold && !input.gst_registered {
        check.status = ComplianceStatus::NonCompliant;
        check.risks.push(RiskFinding {
            severity: "high".into(),
            issue: "GST registration required".into(),
            detail: format!(
                "Turnover {} exceeds {} threshold",
                format_inr(input.turnover),
                format_inr(threshold)
            ),
        });
        check.recommendations.push("Apply for GST registration immediately".into());
    }

    if input.gst_registered {
        check.recommendations.push("Ensure timely GSTR-1 and GSTR-3B filing".into());
    }

    check
}

pub fn check_income_tax(input: &CheckInput) -> IncomeTaxCheck {
    let filing_required = input.income > BASIC_EXEMPTION;

    let (tax_regime_suggestion, recommendations) = if filing_required {
        let regime = if input.estimated_deductions > OLD_REGIME_DEDUCTION_HINT {
            TaxRegime::OldRegime
        } else {
            TaxRegime::NewRegime
        };
        (Some(regime), vec!["File ITR before due date".to_string()])
    } else {
        (None, Vec::new())
    };

    IncomeTaxCheck {
        status: ComplianceStatus::Compliant,
        filing_required,
        estimated_tax: new_regime_tax(input.income),
        tax_regime_suggestion,
        recommendations,
    }
}

pub fn check_advance_tax(input: &CheckInput) -> AdvanceTaxCheck {
    let estimated_tax = new_regime_tax(input.income);
    let required = estimated_tax > ADVANCE_TAX_THRESHOLD;

    let deadlines = if required {
        ADVANCE_TAX_INSTALLMENTS
            .iter()
            .map(|(date, percentage)| Installment {
                date: (*date).to_string(),
                percentage: *percentage,
                cumulative_amount: (estimated_tax * Decimal::from(*percentage) / dec!(100)).round_dp(0),
            })
            .collect()
    } else {
        Vec::new()
    };

    AdvanceTaxCheck {
        required,
        estimated_tax,
        deadlines,
    }
}

pub fn check_tds(input: &CheckInput) -> TdsCheck {
    let tds_deduction_required = input.turnover > TDS_DEDUCTION_THRESHOLD;

    let mut recommendations = Vec::new();
    if tds_deduction_required {
        recommendations.push("Obtain TAN and deduct TDS on applicable payments".into());
    }

    TdsCheck {
        tds_deduction_required,
        tds_applicable_on_receipts: true,
        recommendations,
    }
}

pub fn check_all(input: &CheckInput) -> FullCheck {
    FullCheck {
        gst: check_gst(input),
        income_tax: check_income_tax(input),
        advance_tax: check_advance_tax(input),
        tds: check_tds(input),
    }
}

/// Rupee amount with Indian digit grouping, e.g. `₹25,00,000`
pub fn format_inr(amount: Decimal) -> String {
    let rounded = amount.round_dp(0);
    let digits = rounded.abs().to_string();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };

    if digits.len() <= 3 {
        return format!("{sign}₹{digits}");
    }

    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (front, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = front;
    }
    groups.push(rest);
    groups.reverse();

    format!("{sign}₹{},{last_three}", groups.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_regime_slabs() {
        assert_eq!(new_regime_tax(dec!(250000)), dec!(0));
        assert_eq!(new_regime_tax(dec!(300000)), dec!(0));
        assert_eq!(new_regime_tax(dec!(500000)), dec!(10000));
        assert_eq!(new_regime_tax(dec!(700000)), dec!(20000));
        assert_eq!(new_regime_tax(dec!(800000)), dec!(30000));
        assert_eq!(new_regime_tax(dec!(1100000)), dec!(65000));
        assert_eq!(new_regime_tax(dec!(1300000)), dec!(100000));
        assert_eq!(new_regime_tax(dec!(2000000)), dec!(290000));
    }

    #[test]
    fn test_gst_threshold_for_unregistered_business() {
        let input = CheckInput {
            turnover: dec!(2500000),
            ..Default::default()
        };
        let check = check_gst(&input);

        assert_eq!(check.status, ComplianceStatus::NonCompliant);
        assert_eq!(check.risks.len(), 1);
        assert_eq!(check.risks[0].detail, "Turnover ₹25,00,000 exceeds ₹20,00,000 threshold");
    }

    #[test]
    fn test_gst_goods_threshold_is_higher() {
        let input = CheckInput {
            turnover: dec!(2500000),
            deals_in_goods: true,
            ..Default::default()
        };
        assert_eq!(check_gst(&input).status, ComplianceStatus::Compliant);
    }

    #[test]
    fn test_registered_business_gets_filing_reminder() {
        let input = CheckInput {
            turnover: dec!(5000000),
            gst_registered: true,
            ..Default::default()
        };
        let check = check_gst(&input);

        assert_eq!(check.status, ComplianceStatus::Compliant);
        assert_eq!(check.recommendations, vec!["Ensure timely GSTR-1 and GSTR-3B filing"]);
    }

    #[test]
    fn test_regime_suggestion() {
        let mut input = CheckInput {
            income: dec!(900000),
            ..Default::default()
        };
        assert_eq!(check_income_tax(&input).tax_regime_suggestion, Some(TaxRegime::NewRegime));

        input.estimated_deductions = dec!(200000);
        assert_eq!(check_income_tax(&input).tax_regime_suggestion, Some(TaxRegime::OldRegime));

        input.income = dec!(280000);
        let check = check_income_tax(&input);
        assert!(!check.filing_required);
        assert_eq!(check.tax_regime_suggestion, None);
    }

    #[test]
    fn test_advance_tax_installments() {
        let input = CheckInput {
            income: dec!(1300000),
            ..Default::default()
        };
        let check = check_advance_tax(&input);

        assert!(check.required);
        assert_eq!(check.estimated_tax, dec!(100000));
        assert_eq!(check.deadlines.len(), 4);
        assert_eq!(check.deadlines[0].cumulative_amount, dec!(15000));
        assert_eq!(check.deadlines[3].cumulative_amount, dec!(100000));

        let small = CheckInput {
            income: dec!(500000),
            ..Default::default()
        };
        assert!(!check_advance_tax(&small).required);
    }

    #[test]
    fn test_tds_threshold() {
        let below = CheckInput {
            turnover: dec!(10000000),
            ..Default::default()
        };
        assert!(!check_tds(&below).tds_deduction_required);

        let above = CheckInput {
            turnover: dec!(10000001),
            ..Default::default()
        };
        let check = check_tds(&above);
        assert!(check.tds_deduction_required);
        assert_eq!(check.recommendations.len(), 1);
    }

    #[test]
    fn test_format_inr() {
        assert_eq!(format_inr(dec!(0)), "₹0");
        assert_eq!(format_inr(dec!(999)), "₹999");
        assert_eq!(format_inr(dec!(1000)), "₹1,000");
        assert_eq!(format_inr(dec!(2500000)), "₹25,00,000");
        assert_eq!(format_inr(dec!(123456789)), "₹12,34,56,789");
        assert_eq!(format_inr(dec!(-150000.4)), "-₹1,50,000");
    }
}
