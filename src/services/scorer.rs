use sp_core::crypto::{AccountId32 as AccountId, Ss58Codec};
use std::collections::BTreeMap;
use tracing::warn;

use crate::chain::Snapshot;
use crate::models::ranking::{
    CommissionHistoryEntry, EraPointsEntry, PayoutEntry, PayoutStatus, RankedValidator, SlashEntry,
    ThousandValidatorRecord,
};
use crate::models::validator::{to_ss58, AccountAge, ValidatorRecord};

/// Pure scoring stage: turns the snapshot plus resolved account ages and
/// the thousand-validator list into ranked rows. No I/O.
pub struct Scorer<'a> {
    snapshot: &'a Snapshot,
    ages: &'a BTreeMap<AccountId, AccountAge>,
    thousand: &'a [ThousandValidatorRecord],
    eras_per_day: u32,
    token_decimals: u32,
}

impl<'a> Scorer<'a> {
    pub fn new(
        snapshot: &'a Snapshot,
        ages: &'a BTreeMap<AccountId, AccountAge>,
        thousand: &'a [ThousandValidatorRecord],
        eras_per_day: u32,
        token_decimals: u32,
    ) -> Self {
        Self {
            snapshot,
            ages,
            thousand,
            eras_per_day,
            token_decimals,
        }
    }

    /// Score every validator, normalize performance, sort and rank.
    /// Validators violating the exposure invariant are logged and skipped.
    pub fn score_all(&self) -> Vec<RankedValidator> {
        let era_points_grand_total = self.era_points_grand_total();
        let era_points_average = if self.snapshot.validators.is_empty() {
            0.0
        } else {
            era_points_grand_total as f64 / self.snapshot.validators.len() as f64
        };

        let mut ranked: Vec<RankedValidator> = self
            .snapshot
            .validators
            .iter()
            .filter_map(|record| {
                let scored =
                    self.score_validator(record, era_points_average, era_points_grand_total);
                if scored.is_none() {
                    warn!(
                        stash = %to_ss58(&record.stash),
                        "active validator without exposure, skipping"
                    );
                }
                scored
            })
            .collect();

        normalize_performance(&mut ranked);

        // Stable sort keeps input order on ties.
        ranked.sort_by(|a, b| b.total_rating.cmp(&a.total_rating));
        for (position, validator) in ranked.iter_mut().enumerate() {
            validator.rank = position as u32 + 1;
        }

        ranked
    }

    fn validator_points_total(&self, stash: &AccountId) -> u64 {
        self.snapshot
            .era_indexes
            .iter()
            .filter_map(|era| self.snapshot.era_points.get(era))
            .filter_map(|points| points.get(stash))
            .map(|p| *p as u64)
            .sum()
    }

    fn era_points_grand_total(&self) -> u64 {
        self.snapshot
            .validators
            .iter()
            .map(|v| self.validator_points_total(&v.stash))
            .sum()
    }

    fn score_validator(
        &self,
        record: &ValidatorRecord,
        era_points_average: f64,
        era_points_grand_total: u64,
    ) -> Option<RankedValidator> {
        let snapshot = self.snapshot;
        let stash = &record.stash;
        let identity = &record.identity;
        let stash_address = to_ss58(stash);

        let active_rating = if record.active { 2 } else { 0 };

        // Stake decomposition. An active validator without exposure breaks
        // the schema invariant and is dropped by the caller.
        let (self_stake, total_stake) = if record.active {
            let exposure = record.exposure.as_ref()?;
            (exposure.own, exposure.total)
        } else {
            (record.staking_ledger.total, record.staking_ledger.total)
        };
        let other_stake = total_stake.saturating_sub(self_stake);

        // Address age, taking the earlier of stash and identity parent.
        let age = self.ages.get(stash).copied().unwrap_or_default();
        let best_created = match age.parent_created_at {
            Some(parent) => age.stash_created_at.min(parent),
            None => age.stash_created_at,
        };
        let height = snapshot.block_height as u64;
        let best_created = best_created as u64;
        let address_creation_rating = if best_created <= height / 4 {
            3
        } else if best_created <= height / 2 {
            2
        } else if best_created <= height * 3 / 4 {
            1
        } else {
            0
        };

        let name = identity.name();
        let verified_identity = identity.is_verified();
        let identity_rating = if verified_identity && identity.has_all_fields() {
            3
        } else if verified_identity {
            2
        } else if !name.is_empty() {
            1
        } else {
            0
        };

        let has_sub_identity = identity.has_sub_identity();
        let sub_accounts_rating = if has_sub_identity { 2 } else { 0 };

        let nominators = if record.active {
            record
                .exposure
                .as_ref()
                .map(|e| e.others.len())
                .unwrap_or(0) as u32
        } else {
            snapshot
                .nominations
                .iter()
                .filter(|n| n.targets.contains(stash))
                .count() as u32
        };
        let nominators_rating =
            if nominators > 0 && nominators <= snapshot.max_nominator_rewarded {
                2
            } else {
                0
            };

        let commission = record.prefs.commission_percent();

        // Per-era walk: histories, performance, payouts, slashes.
        let mut commission_history = Vec::with_capacity(snapshot.era_indexes.len());
        let mut era_points_history = Vec::with_capacity(snapshot.era_indexes.len());
        let mut payout_history = Vec::with_capacity(snapshot.era_indexes.len());
        let mut slashes = Vec::new();
        let mut performance = 0.0_f64;
        let mut active_eras = 0_u32;
        let token_unit = 10_f64.powi(self.token_decimals as i32);

        for &era in &snapshot.era_indexes {
            let era_commission = snapshot
                .era_prefs
                .get(&era)
                .and_then(|prefs| prefs.get(stash))
                .map(|prefs| prefs.commission_percent());
            commission_history.push(CommissionHistoryEntry {
                era,
                commission: era_commission,
            });

            if let Some(amount) = snapshot
                .era_slashes
                .get(&era)
                .and_then(|slashes| slashes.get(stash))
            {
                slashes.push(SlashEntry { era, amount: *amount });
            }

            let exposure = snapshot
                .era_exposures
                .get(&era)
                .and_then(|exposures| exposures.get(stash))
                .filter(|exposure| exposure.total > 0);

            match exposure {
                Some(exposure) => {
                    active_eras += 1;
                    let points = snapshot
                        .era_points
                        .get(&era)
                        .and_then(|points| points.get(stash))
                        .copied()
                        .unwrap_or(0);
                    era_points_history.push(EraPointsEntry { era, points });

                    let effective_commission = era_commission.unwrap_or(commission);
                    let era_total_stake = exposure.total as f64 / token_unit;
                    if era_total_stake > 0.0 {
                        performance +=
                            points as f64 * (1.0 - effective_commission / 100.0) / era_total_stake;
                    }

                    let status = if record.staking_ledger.claimed_rewards.contains(&era) {
                        PayoutStatus::Paid
                    } else {
                        PayoutStatus::Pending
                    };
                    payout_history.push(PayoutEntry { era, status });
                }
                None => {
                    era_points_history.push(EraPointsEntry { era, points: 0 });
                    payout_history.push(PayoutEntry {
                        era,
                        status: PayoutStatus::Inactive,
                    });
                }
            }
        }

        let commission_rating =
            commission_rating(commission, &commission_history);

        let points_total = self.validator_points_total(stash);
        let era_points_rating = if points_total as f64 > era_points_average {
            2
        } else {
            0
        };
        let era_points_percent = if era_points_grand_total > 0 {
            points_total as f64 * 100.0 / era_points_grand_total as f64
        } else {
            0.0
        };

        let slashed = !slashes.is_empty();
        let slash_rating = if slashed { 0 } else { 2 };

        let parent_account = identity
            .parent
            .as_deref()
            .and_then(|parent| AccountId::from_ss58check(parent).ok());
        let council_backing = snapshot.council_voters.contains(stash)
            || parent_account
                .as_ref()
                .is_some_and(|parent| snapshot.council_voters.contains(parent));
        let active_in_governance = snapshot.governance_participants.contains(stash)
            || parent_account
                .as_ref()
                .is_some_and(|parent| snapshot.governance_participants.contains(parent));
        let governance_rating = match (council_backing, active_in_governance) {
            (true, true) => 3,
            (false, false) => 0,
            _ => 2,
        };

        let pending = payout_history
            .iter()
            .filter(|entry| entry.status == PayoutStatus::Pending)
            .count() as u32;
        let payout_rating = payout_rating(pending, self.eras_per_day);

        let thousand_validator = self
            .thousand
            .iter()
            .find(|candidate| candidate.stash == stash_address)
            .cloned();

        let mut ranked = RankedValidator {
            rank: 0,
            name,
            stash_address,
            controller_address: to_ss58(&record.controller),
            active: record.active,
            active_rating,
            identity: identity.clone(),
            has_sub_identity,
            sub_accounts_rating,
            verified_identity,
            identity_rating,
            stash_created_at_block: age.stash_created_at,
            stash_parent_created_at_block: age.parent_created_at,
            address_creation_rating,
            nominators,
            nominators_rating,
            commission,
            commission_history,
            commission_rating,
            active_eras,
            era_points_history,
            era_points_percent,
            era_points_rating,
            performance,
            relative_performance: 0.0,
            slashed,
            slashes,
            slash_rating,
            council_backing,
            active_in_governance,
            governance_rating,
            payout_history,
            payout_rating,
            self_stake,
            total_stake,
            other_stake,
            included_thousand_validators: thousand_validator.is_some(),
            thousand_validator,
            part_of_cluster: false,
            cluster_name: String::new(),
            cluster_members: 0,
            show_cluster_member: true,
            dominated: false,
            total_rating: 0,
        };
        ranked.total_rating = ranked.rating_sum();
        Some(ranked)
    }
}

/// Commission band scoring. Both extremes are rejected outright; mid-band
/// validators earn the top grade when their recorded window trends down.
fn commission_rating(commission: f64, history: &[CommissionHistoryEntry]) -> i32 {
    if commission == 0.0 || commission == 100.0 {
        0
    } else if commission > 10.0 {
        1
    } else if commission >= 5.0 {
        if is_trending_down(history) {
            3
        } else {
            2
        }
    } else {
        3
    }
}

/// Numeric comparison of the oldest and newest recorded commissions.
fn is_trending_down(history: &[CommissionHistoryEntry]) -> bool {
    let recorded: Vec<f64> = history.iter().filter_map(|entry| entry.commission).collect();
    match (recorded.first(), recorded.last()) {
        (Some(oldest), Some(newest)) if recorded.len() > 1 => oldest > newest,
        _ => false,
    }
}

fn payout_rating(pending: u32, eras_per_day: u32) -> i32 {
    if pending <= eras_per_day {
        3
    } else if pending <= 3 * eras_per_day {
        2
    } else if pending < 7 * eras_per_day {
        1
    } else {
        0
    }
}

/// Scale performances into [0, 1]. The minimum starts at zero, so a field
/// of all-positive performers is measured against zero rather than its
/// actual floor; the maximum performer always maps to 1 when any spread
/// exists, and a flat field maps to 0 to avoid dividing by zero.
fn normalize_performance(validators: &mut [RankedValidator]) {
    let mut min_performance = 0.0_f64;
    let mut max_performance = 0.0_f64;
    for validator in validators.iter() {
        min_performance = min_performance.min(validator.performance);
        max_performance = max_performance.max(validator.performance);
    }

    let spread = max_performance - min_performance;
    for validator in validators.iter_mut() {
        validator.relative_performance = if spread > 0.0 {
            round6((validator.performance - min_performance) / spread)
        } else {
            0.0
        };
    }
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
