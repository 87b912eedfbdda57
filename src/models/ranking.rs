use serde::{Deserialize, Serialize};

use crate::models::identity::Identity;
use crate::models::validator::{EraIndex, Stake};

/// Commission recorded for one era of the window; None when the validator
/// had no preferences stored for that era.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionHistoryEntry {
    pub era: EraIndex,
    pub commission: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EraPointsEntry {
    pub era: EraIndex,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Paid,
    Pending,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutEntry {
    pub era: EraIndex,
    pub status: PayoutStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlashEntry {
    pub era: EraIndex,
    pub amount: Stake,
}

/// Raw candidate record from the thousand-validator programme endpoint.
/// Only the stash is interpreted; the rest is persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThousandValidatorRecord {
    pub stash: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A fully scored validator, as persisted into the `ranking` table.
/// Exists only within a single run; written once, never mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankedValidator {
    pub rank: u32,
    pub name: String,
    pub stash_address: String,
    pub controller_address: String,

    pub active: bool,
    pub active_rating: i32,

    pub identity: Identity,
    pub has_sub_identity: bool,
    pub sub_accounts_rating: i32,
    pub verified_identity: bool,
    pub identity_rating: i32,

    pub stash_created_at_block: u32,
    pub stash_parent_created_at_block: Option<u32>,
    pub address_creation_rating: i32,

    pub nominators: u32,
    pub nominators_rating: i32,

    pub commission: f64,
    pub commission_history: Vec<CommissionHistoryEntry>,
    pub commission_rating: i32,

    pub active_eras: u32,
    pub era_points_history: Vec<EraPointsEntry>,
    pub era_points_percent: f64,
    pub era_points_rating: i32,

    pub performance: f64,
    pub relative_performance: f64,

    pub slashed: bool,
    pub slashes: Vec<SlashEntry>,
    pub slash_rating: i32,

    pub council_backing: bool,
    pub active_in_governance: bool,
    pub governance_rating: i32,

    pub payout_history: Vec<PayoutEntry>,
    pub payout_rating: i32,

    pub self_stake: Stake,
    pub total_stake: Stake,
    pub other_stake: Stake,

    pub included_thousand_validators: bool,
    pub thousand_validator: Option<ThousandValidatorRecord>,

    pub part_of_cluster: bool,
    pub cluster_name: String,
    pub cluster_members: u32,
    pub show_cluster_member: bool,

    pub dominated: bool,
    pub total_rating: i32,
}

impl RankedValidator {
    /// Sum of the component ratings; `total_rating` must always equal this.
    pub fn rating_sum(&self) -> i32 {
        self.active_rating
            + self.address_creation_rating
            + self.identity_rating
            + self.sub_accounts_rating
            + self.nominators_rating
            + self.commission_rating
            + self.era_points_rating
            + self.slash_rating
            + self.governance_rating
            + self.payout_rating
    }
}
