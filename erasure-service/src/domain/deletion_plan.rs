// src/domain/deletion_plan.rs

//! Declarative cascade plans, one per subject type.
//!
//! Entries are grouped into dependency tiers. Every tier runs after all lower
//! tiers have finished; entries sharing a tier are independent of each other.
//! A collection that holds a foreign key into another purge target always sits
//! in a lower tier than that target, and the subject's own profile row is the
//! final tier.

use serde::Serialize;

use super::subject::SubjectType;

/// Written into identifying text columns of anonymized rows.
pub const ANONYMIZED_TEXT: &str = "[erased]";

/// How the rows belonging to a subject are located in a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowSelector {
    /// `column = subject_id`
    Direct { column: &'static str },
    /// `column IN (SELECT id FROM parent WHERE parent_column = subject_id)`
    Owned {
        column: &'static str,
        parent: &'static str,
        parent_column: &'static str,
    },
}

impl RowSelector {
    pub fn column(&self) -> &'static str {
        match self {
            RowSelector::Direct { column } | RowSelector::Owned { column, .. } => column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum PurgePolicy {
    Delete,
    /// Keep the row; the subject reference becomes the nil UUID and each
    /// scrub column becomes [`ANONYMIZED_TEXT`].
    Anonymize { scrub_columns: &'static [&'static str] },
}

impl PurgePolicy {
    pub fn is_anonymize(&self) -> bool {
        matches!(self, PurgePolicy::Anonymize { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub collection: &'static str,
    pub selector: RowSelector,
    pub policy: PurgePolicy,
    pub tier: u8,
}

const fn delete(collection: &'static str, selector: RowSelector, tier: u8) -> PlanEntry {
    PlanEntry {
        collection,
        selector,
        policy: PurgePolicy::Delete,
        tier,
    }
}

const fn anonymize(
    collection: &'static str,
    column: &'static str,
    scrub_columns: &'static [&'static str],
    tier: u8,
) -> PlanEntry {
    PlanEntry {
        collection,
        selector: RowSelector::Direct { column },
        policy: PurgePolicy::Anonymize { scrub_columns },
        tier,
    }
}

const fn direct(column: &'static str) -> RowSelector {
    RowSelector::Direct { column }
}

const fn owned(
    column: &'static str,
    parent: &'static str,
    parent_column: &'static str,
) -> RowSelector {
    RowSelector::Owned {
        column,
        parent,
        parent_column,
    }
}

static RENTER_PLAN: [PlanEntry; 9] = [
    // 会話に属するメッセージは会話より先に消す
    delete("messages", owned("conversation_id", "conversations", "renter_id"), 0),
    delete("viewing_requests", direct("renter_id"), 0),
    delete("rental_applications", direct("renter_id"), 0),
    delete("saved_searches", direct("renter_id"), 0),
    delete("conversations", direct("renter_id"), 1),
    delete("matches", direct("renter_id"), 2),
    // 評価は物件・家主の集計に使われるので匿名化
    anonymize("ratings", "rater_id", &["comment"], 3),
    anonymize("ratings", "ratee_id", &["comment"], 3),
    delete("renter_profiles", direct("id"), 4),
];

static LANDLORD_PLAN: [PlanEntry; 10] = [
    delete("messages", owned("conversation_id", "conversations", "landlord_id"), 0),
    delete("rental_applications", owned("property_id", "properties", "landlord_id"), 0),
    delete("viewing_requests", direct("landlord_id"), 0),
    delete("conversations", direct("landlord_id"), 1),
    delete("matches", direct("landlord_id"), 2),
    delete("properties", direct("landlord_id"), 3),
    anonymize("ratings", "rater_id", &["comment"], 4),
    anonymize("ratings", "ratee_id", &["comment"], 4),
    // 請求書は法定保存期間があるため匿名化のみ
    anonymize("invoices", "landlord_id", &["billing_name", "billing_address"], 4),
    delete("landlord_profiles", direct("id"), 5),
];

static AGENCY_PLAN: [PlanEntry; 4] = [
    delete("agency_agents", direct("agency_id"), 0),
    // 物件自体は家主のものなので代理店の参照だけ外す
    anonymize("properties", "agency_id", &["agency_contact"], 0),
    anonymize("invoices", "agency_id", &["billing_name", "billing_address"], 1),
    delete("agency_profiles", direct("id"), 2),
];

static ADMIN_PLAN: [PlanEntry; 2] = [
    anonymize("admin_notes", "author_id", &["body"], 0),
    delete("admin_profiles", direct("id"), 1),
];

/// Ordered cascade plan for a subject type, lowest tier first.
pub fn plan_for(subject_type: SubjectType) -> &'static [PlanEntry] {
    match subject_type {
        SubjectType::Renter => &RENTER_PLAN,
        SubjectType::Landlord => &LANDLORD_PLAN,
        SubjectType::Agency => &AGENCY_PLAN,
        SubjectType::Admin => &ADMIN_PLAN,
    }
}

/// Splits a plan into consecutive same-tier groups.
pub fn tiers(plan: &'static [PlanEntry]) -> Vec<&'static [PlanEntry]> {
    plan.chunk_by(|a, b| a.tier == b.tier).collect()
}
