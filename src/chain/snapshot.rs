use futures::{stream, StreamExt};
use sp_core::crypto::AccountId32 as AccountId;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::chain::ChainApi;
use crate::models::identity::Identity;
use crate::models::validator::{
    EraIndex, Exposure, Nomination, Stake, StakingLedger, ValidatorPrefs, ValidatorRecord,
};
use crate::utils::errors::Result;

/// Identity enrichment pool width. One identity query per account, at most
/// this many outstanding at once.
const ENRICHMENT_CONCURRENCY: usize = 8;

/// Frozen view of the chain at one block, plus the historical era window.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub block_height: u32,
    pub current_era: EraIndex,
    pub era_indexes: Vec<EraIndex>,
    /// Active validators first, then waiting intentions, each in chain order.
    pub validators: Vec<ValidatorRecord>,
    pub nominations: Vec<Nomination>,
    pub council_voters: BTreeSet<AccountId>,
    pub governance_participants: BTreeSet<AccountId>,
    pub era_points: BTreeMap<EraIndex, BTreeMap<AccountId, u32>>,
    pub era_prefs: BTreeMap<EraIndex, BTreeMap<AccountId, ValidatorPrefs>>,
    pub era_slashes: BTreeMap<EraIndex, BTreeMap<AccountId, Stake>>,
    pub era_exposures: BTreeMap<EraIndex, BTreeMap<AccountId, Exposure>>,
    pub max_nominator_rewarded: u32,
}

/// Fan out the chain queries for one run and join them into a `Snapshot`.
/// Any RPC failure aborts the whole collection.
pub async fn collect_snapshot(api: &dyn ChainApi, history_size: u32) -> Result<Snapshot> {
    let (active_era, history_depth) = tokio::try_join!(api.active_era(), api.history_depth())?;

    // Tail of the historic era list, at most history_size eras.
    let span = history_size.min(history_depth).min(active_era + 1);
    let first = active_era + 1 - span;
    let era_indexes: Vec<EraIndex> = (first..=active_era).collect();

    let (
        block_height,
        current_era,
        session,
        entries,
        nominations,
        council_voters,
        governance_participants,
        max_nominator_rewarded,
        era_data,
    ) = tokio::try_join!(
        api.best_block_number(),
        api.current_era(),
        api.session_validators(),
        api.validator_entries(),
        api.nominator_entries(),
        api.council_voters(),
        api.governance_participants(),
        api.max_nominator_rewarded(),
        collect_era_data(api, &era_indexes),
    )?;

    let (era_points, era_prefs, era_slashes, era_exposures) = era_data;

    debug!(
        block_height,
        current_era,
        eras = era_indexes.len(),
        "chain state joined"
    );

    let prefs_by_stash: BTreeMap<AccountId, ValidatorPrefs> = entries.iter().cloned().collect();
    let active_set: BTreeSet<AccountId> = session.iter().cloned().collect();

    // Active validators first, then waiting intentions, both in chain order.
    let mut stashes: Vec<(AccountId, bool)> =
        session.iter().map(|s| (s.clone(), true)).collect();
    stashes.extend(
        entries
            .iter()
            .filter(|(stash, _)| !active_set.contains(stash))
            .map(|(stash, _)| (stash.clone(), false)),
    );

    let exposures = era_exposures.get(&active_era).cloned().unwrap_or_default();

    let mut validators = Vec::with_capacity(stashes.len());
    let enriched = stream::iter(stashes)
        .map(|(stash, active)| async move {
            let (identity, controller, ledger) = enrich_account(api, &stash).await?;
            Ok::<_, crate::utils::errors::RankingError>((stash, active, identity, controller, ledger))
        })
        .buffered(ENRICHMENT_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    for item in enriched {
        let (stash, active, identity, controller, ledger) = item?;
        validators.push(ValidatorRecord {
            prefs: prefs_by_stash.get(&stash).copied().unwrap_or_default(),
            exposure: if active { exposures.get(&stash).cloned() } else { None },
            controller: controller.unwrap_or_else(|| stash.clone()),
            staking_ledger: ledger.unwrap_or_default(),
            stash,
            active,
            identity,
        });
    }

    info!(
        validators = validators.len(),
        nominators = nominations.len(),
        block_height,
        "snapshot collected"
    );

    Ok(Snapshot {
        block_height,
        current_era,
        era_indexes,
        validators,
        nominations,
        council_voters,
        governance_participants,
        era_points,
        era_prefs,
        era_slashes,
        era_exposures,
        max_nominator_rewarded,
    })
}

type EraData = (
    BTreeMap<EraIndex, BTreeMap<AccountId, u32>>,
    BTreeMap<EraIndex, BTreeMap<AccountId, ValidatorPrefs>>,
    BTreeMap<EraIndex, BTreeMap<AccountId, Stake>>,
    BTreeMap<EraIndex, BTreeMap<AccountId, Exposure>>,
);

/// Era queries run sequentially per era; the four per-era lookups are
/// joined. The RPC is stateful and the window is small, so this stays
/// well under the node's request limits.
async fn collect_era_data(api: &dyn ChainApi, era_indexes: &[EraIndex]) -> Result<EraData> {
    let mut points = BTreeMap::new();
    let mut prefs = BTreeMap::new();
    let mut slashes = BTreeMap::new();
    let mut exposures = BTreeMap::new();

    for &era in era_indexes {
        let (p, pr, sl, ex) = tokio::try_join!(
            api.era_points(era),
            api.era_prefs(era),
            api.era_slashes(era),
            api.era_exposure(era),
        )?;
        points.insert(era, p);
        prefs.insert(era, pr);
        slashes.insert(era, sl);
        exposures.insert(era, ex);
    }

    Ok((points, prefs, slashes, exposures))
}

async fn enrich_account(
    api: &dyn ChainApi,
    stash: &AccountId,
) -> Result<(Identity, Option<AccountId>, Option<StakingLedger>)> {
    let (identity, controller) = tokio::try_join!(api.identity_of(stash), api.controller_of(stash))?;
    let ledger = match &controller {
        Some(controller) => api.ledger_of(controller).await?,
        None => None,
    };
    Ok((identity, controller, ledger))
}
