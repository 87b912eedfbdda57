use sp_core::crypto::{AccountId32 as AccountId, Ss58Codec};
use std::collections::BTreeSet;

use crate::models::identity::Identity;

pub type EraIndex = u32;

/// Chain-native balance. Substrate balances are u128; sums over a single
/// validator's nominators are bounded by total issuance, so arithmetic
/// stays exact.
pub type Stake = u128;

pub fn to_ss58(account: &AccountId) -> String {
    account.to_ss58check()
}

/// One nominator's share of a validator's backing in an era.
#[derive(Debug, Clone)]
pub struct IndividualExposure {
    pub who: AccountId,
    pub value: Stake,
}

/// Per-era record of a validator's own stake plus nominator stakes.
#[derive(Debug, Clone, Default)]
pub struct Exposure {
    pub total: Stake,
    pub own: Stake,
    pub others: Vec<IndividualExposure>,
}

#[derive(Debug, Clone, Default)]
pub struct StakingLedger {
    pub total: Stake,
    pub claimed_rewards: BTreeSet<EraIndex>,
}

/// Validator preferences. Commission is an integer in parts-per-billion.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatorPrefs {
    pub commission: u64,
}

impl ValidatorPrefs {
    /// Commission as a percentage with two-decimal precision.
    pub fn commission_percent(&self) -> f64 {
        self.commission as f64 / 1e7
    }
}

/// One nominator entry: who nominates, and the targets they back.
#[derive(Debug, Clone)]
pub struct Nomination {
    pub nominator: AccountId,
    pub targets: Vec<AccountId>,
}

/// A validator (active or waiting intention) before scoring.
#[derive(Debug, Clone)]
pub struct ValidatorRecord {
    pub stash: AccountId,
    pub controller: AccountId,
    pub active: bool,
    pub identity: Identity,
    /// Current-era exposure; present for active validators only.
    pub exposure: Option<Exposure>,
    pub staking_ledger: StakingLedger,
    pub prefs: ValidatorPrefs,
}

/// Block heights at which a stash and its identity parent first appeared.
/// Zero means genesis-present.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountAge {
    pub stash_created_at: u32,
    pub parent_created_at: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commission_maps_perbill_to_percent() {
        let prefs = ValidatorPrefs { commission: 70_000_000 };
        assert!((prefs.commission_percent() - 7.0).abs() < 1e-9);

        let max = ValidatorPrefs { commission: 1_000_000_000 };
        assert!((max.commission_percent() - 100.0).abs() < 1e-9);
    }
}
