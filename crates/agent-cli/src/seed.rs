//! Demo data for the in-memory store

use agent_core::state::{
    ComplianceRisk, Deadline, DeadlineStatus, Entity, EntityType, RiskSeverity, TaxProfile,
    UserProfile,
};
use agent_core::MemoryStateStore;
use chrono::{Duration, Utc};

/// Queries run by `--demo`
pub const DEMO_QUERIES: [&str; 5] = [
    "What deadlines are coming up this month?",
    "My turnover this year is about 25 lakh. Do I need GST registration?",
    "Roughly how much income tax will I pay on 13 lakh?",
    "How should I categorize this transaction: NEFT professional fees from Acme?",
    "Can you show my profile and PAN?",
];

/// A proprietorship with one open risk and one pending GST return
pub async fn seed_demo_user(store: &MemoryStateStore, user_id: &str) {
    let now = Utc::now();
    let entity_id = format!("{}-entity", user_id);

    store
        .upsert_user(UserProfile {
            user_id: user_id.to_string(),
            name: Some("Demo User".into()),
            email: Some("demo@example.com".into()),
        })
        .await;

    store
        .add_entity(Entity {
            entity_id: entity_id.clone(),
            user_id: user_id.to_string(),
            name: "Demo Traders".into(),
            entity_type: EntityType::Proprietorship,
            tax_profile: TaxProfile {
                pan: Some("ABCDE1234F".into()),
                gst_registered: true,
                gstin: Some("27ABCDE1234F1Z5".into()),
            },
            is_primary: true,
        })
        .await;

    store
        .add_risk(ComplianceRisk {
            risk_id: format!("{}-risk-1", user_id),
            entity_id: entity_id.clone(),
            category: "gst".into(),
            severity: RiskSeverity::Medium,
            title: "Input tax credit mismatch in GSTR-2B".into(),
            detected_at: now - Duration::days(2),
            resolved_at: None,
        })
        .await;

    store
        .add_deadline(Deadline {
            deadline_id: format!("{}-gstr3b", user_id),
            entity_id,
            deadline_type: "gstr3b".into(),
            due_date: now + Duration::days(5),
            status: DeadlineStatus::Pending,
        })
        .await;

    tracing::debug!(user = user_id, "Seeded demo user");
}
