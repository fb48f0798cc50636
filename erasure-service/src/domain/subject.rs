// src/domain/subject.rs

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of account an erasure request targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    #[sea_orm(string_value = "renter")]
    Renter,
    #[sea_orm(string_value = "landlord")]
    Landlord,
    #[sea_orm(string_value = "agency")]
    Agency,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Renter => "renter",
            SubjectType::Landlord => "landlord",
            SubjectType::Agency => "agency",
            SubjectType::Admin => "admin",
        }
    }

    /// プロフィールを保持するテーブル名
    pub fn profile_table(&self) -> &'static str {
        match self {
            SubjectType::Renter => "renter_profiles",
            SubjectType::Landlord => "landlord_profiles",
            SubjectType::Agency => "agency_profiles",
            SubjectType::Admin => "admin_profiles",
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "renter" => Ok(SubjectType::Renter),
            "landlord" => Ok(SubjectType::Landlord),
            "agency" => Ok(SubjectType::Agency),
            "admin" => Ok(SubjectType::Admin),
            other => Err(format!("Unknown subject type: {}", other)),
        }
    }
}
