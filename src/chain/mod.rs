pub mod snapshot;
pub mod substrate;

pub use snapshot::{collect_snapshot, Snapshot};
pub use substrate::SubstrateApi;

use async_trait::async_trait;
use sp_core::crypto::AccountId32 as AccountId;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::identity::Identity;
use crate::models::validator::{EraIndex, Exposure, Nomination, Stake, StakingLedger, ValidatorPrefs};
use crate::utils::errors::Result;

/// Runtime queries the ranking pipeline needs from a Substrate node.
///
/// The pipeline consumes this trait only; `SubstrateApi` adapts it onto a
/// live subxt client, tests substitute an in-memory implementation.
#[async_trait]
pub trait ChainApi: Send + Sync {
    async fn best_block_number(&self) -> Result<u32>;
    async fn active_era(&self) -> Result<EraIndex>;
    async fn current_era(&self) -> Result<EraIndex>;
    async fn history_depth(&self) -> Result<u32>;

    /// Accounts in the current session's author set, in chain order.
    async fn session_validators(&self) -> Result<Vec<AccountId>>;
    /// All declared validators (active and waiting) with their preferences,
    /// in chain order.
    async fn validator_entries(&self) -> Result<Vec<(AccountId, ValidatorPrefs)>>;
    async fn controller_of(&self, stash: &AccountId) -> Result<Option<AccountId>>;
    async fn ledger_of(&self, controller: &AccountId) -> Result<Option<StakingLedger>>;
    async fn nominator_entries(&self) -> Result<Vec<Nomination>>;

    /// Accounts currently voting in council elections.
    async fn council_voters(&self) -> Result<BTreeSet<AccountId>>;
    /// Democracy proposers, seconders, and referendum voters.
    async fn governance_participants(&self) -> Result<BTreeSet<AccountId>>;

    async fn era_points(&self, era: EraIndex) -> Result<BTreeMap<AccountId, u32>>;
    async fn era_prefs(&self, era: EraIndex) -> Result<BTreeMap<AccountId, ValidatorPrefs>>;
    async fn era_slashes(&self, era: EraIndex) -> Result<BTreeMap<AccountId, Stake>>;
    async fn era_exposure(&self, era: EraIndex) -> Result<BTreeMap<AccountId, Exposure>>;

    async fn identity_of(&self, who: &AccountId) -> Result<Identity>;
    async fn max_nominator_rewarded(&self) -> Result<u32>;
}
