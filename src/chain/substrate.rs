use async_trait::async_trait;
use sp_core::crypto::AccountId32 as AccountId;
use std::collections::{BTreeMap, BTreeSet};
use subxt::dynamic::{self, Value};
use subxt::ext::scale_value::{At, Composite, Primitive, Value as ScaleValue, ValueDef};
use subxt::{OnlineClient, PolkadotConfig};
use tracing::warn;

use crate::chain::ChainApi;
use crate::models::identity::{Identity, Judgement, JudgementKind};
use crate::models::validator::{
    EraIndex, Exposure, IndividualExposure, Nomination, Stake, StakingLedger, ValidatorPrefs,
};
use crate::utils::errors::{RankingError, Result};

/// Fallback when the staking pallet exposes no nominator-reward constant
/// under either of its historical names.
const DEFAULT_MAX_NOMINATOR_REWARDED: u32 = 512;

type Decoded = ScaleValue<u32>;

/// subxt-backed implementation of [`ChainApi`], using dynamic storage
/// queries so the service runs against any Substrate chain with the
/// standard staking, identity, elections, and democracy pallets.
pub struct SubstrateApi {
    client: OnlineClient<PolkadotConfig>,
}

impl SubstrateApi {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = OnlineClient::<PolkadotConfig>::from_url(url).await?;
        Ok(Self { client })
    }

    async fn fetch(&self, pallet: &str, entry: &str, keys: Vec<Value>) -> Result<Option<Decoded>> {
        let storage = self.client.storage().at_latest().await?;
        let addr = dynamic::storage(pallet, entry, keys);
        match storage.fetch(&addr).await? {
            Some(thunk) => Ok(Some(thunk.to_value()?)),
            None => Ok(None),
        }
    }

    /// Iterate a map, yielding (last-32-key-bytes as AccountId, value).
    /// All maps the adapter walks are keyed by AccountId under a
    /// concat-style hasher, so the trailing bytes are the account itself.
    async fn iter_account_map(
        &self,
        pallet: &str,
        entry: &str,
        keys: Vec<Value>,
    ) -> Result<Vec<(AccountId, Decoded)>> {
        let storage = self.client.storage().at_latest().await?;
        let addr = dynamic::storage(pallet, entry, keys);
        let mut iter = storage.iter(addr).await?;
        let mut out = Vec::new();
        while let Some(pair) = iter.next().await {
            let pair = pair?;
            let account = account_from_key_bytes(&pair.key_bytes)?;
            out.push((account, pair.value.to_value()?));
        }
        Ok(out)
    }

    async fn constant_u32(&self, pallet: &str, name: &str) -> Result<u32> {
        let addr = dynamic::constant(pallet, name);
        let value = self.client.constants().at(&addr)?.to_value()?;
        as_u128(&value)
            .map(|n| n as u32)
            .ok_or_else(|| RankingError::Decode(format!("{}::{} is not numeric", pallet, name)))
    }
}

#[async_trait]
impl ChainApi for SubstrateApi {
    async fn best_block_number(&self) -> Result<u32> {
        let block = self.client.blocks().at_latest().await?;
        let number: u64 = block.number().into();
        Ok(number as u32)
    }

    async fn active_era(&self) -> Result<EraIndex> {
        let value = self
            .fetch("Staking", "ActiveEra", vec![])
            .await?
            .ok_or_else(|| RankingError::Decode("Staking::ActiveEra is empty".into()))?;
        let index = value
            .at("index")
            .and_then(as_u128)
            .ok_or_else(|| RankingError::Decode("ActiveEra has no index".into()))?;
        Ok(index as EraIndex)
    }

    async fn current_era(&self) -> Result<EraIndex> {
        let value = self
            .fetch("Staking", "CurrentEra", vec![])
            .await?
            .ok_or_else(|| RankingError::Decode("Staking::CurrentEra is empty".into()))?;
        let era = as_u128(&value)
            .ok_or_else(|| RankingError::Decode("CurrentEra is not numeric".into()))?;
        Ok(era as EraIndex)
    }

    async fn history_depth(&self) -> Result<u32> {
        self.constant_u32("Staking", "HistoryDepth").await
    }

    async fn session_validators(&self) -> Result<Vec<AccountId>> {
        let value = self
            .fetch("Session", "Validators", vec![])
            .await?
            .ok_or_else(|| RankingError::Decode("Session::Validators is empty".into()))?;
        sequence_values(&value).into_iter().map(as_account).collect()
    }

    async fn validator_entries(&self) -> Result<Vec<(AccountId, ValidatorPrefs)>> {
        let entries = self.iter_account_map("Staking", "Validators", vec![]).await?;
        entries
            .into_iter()
            .map(|(stash, value)| Ok((stash, prefs_from_value(&value)?)))
            .collect()
    }

    async fn controller_of(&self, stash: &AccountId) -> Result<Option<AccountId>> {
        match self
            .fetch("Staking", "Bonded", vec![account_key(stash)])
            .await?
        {
            Some(value) => Ok(Some(as_account(&value)?)),
            None => Ok(None),
        }
    }

    async fn ledger_of(&self, controller: &AccountId) -> Result<Option<StakingLedger>> {
        let value = match self
            .fetch("Staking", "Ledger", vec![account_key(controller)])
            .await?
        {
            Some(value) => value,
            None => return Ok(None),
        };
        let total = value.at("total").and_then(as_u128).unwrap_or(0);
        // Renamed to legacy_claimed_rewards in recent runtimes.
        let claimed = value
            .at("claimed_rewards")
            .or_else(|| value.at("legacy_claimed_rewards"))
            .map(|v| {
                sequence_values(v)
                    .into_iter()
                    .filter_map(as_u128)
                    .map(|era| era as EraIndex)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Some(StakingLedger {
            total,
            claimed_rewards: claimed,
        }))
    }

    async fn nominator_entries(&self) -> Result<Vec<Nomination>> {
        let entries = self.iter_account_map("Staking", "Nominators", vec![]).await?;
        entries
            .into_iter()
            .map(|(nominator, value)| {
                let targets = value
                    .at("targets")
                    .map(|t| {
                        sequence_values(t)
                            .into_iter()
                            .map(as_account)
                            .collect::<Result<Vec<AccountId>>>()
                    })
                    .transpose()?
                    .unwrap_or_default();
                Ok(Nomination { nominator, targets })
            })
            .collect()
    }

    async fn council_voters(&self) -> Result<BTreeSet<AccountId>> {
        let entries = self
            .iter_account_map("PhragmenElection", "Voting", vec![])
            .await?;
        Ok(entries.into_iter().map(|(voter, _)| voter).collect())
    }

    async fn governance_participants(&self) -> Result<BTreeSet<AccountId>> {
        let mut participants = BTreeSet::new();

        // Proposers: PublicProps is Vec<(index, proposal, proposer)>.
        if let Some(props) = self.fetch("Democracy", "PublicProps", vec![]).await? {
            for prop in sequence_values(&props) {
                if let Some(proposer) = prop.at(2).and_then(|v| as_account(v).ok()) {
                    participants.insert(proposer);
                }
            }
        }

        // Seconders: DepositOf values are (Vec<AccountId>, Balance).
        let storage = self.client.storage().at_latest().await?;
        let addr = dynamic::storage("Democracy", "DepositOf", Vec::<Value>::new());
        let mut iter = storage.iter(addr).await?;
        while let Some(pair) = iter.next().await {
            let value = pair?.value.to_value()?;
            if let Some(seconders) = value.at(0) {
                for v in sequence_values(seconders) {
                    if let Ok(account) = as_account(v) {
                        participants.insert(account);
                    }
                }
            }
        }

        // Referendum voters.
        let voters = self.iter_account_map("Democracy", "VotingOf", vec![]).await?;
        participants.extend(voters.into_iter().map(|(voter, _)| voter));

        Ok(participants)
    }

    async fn era_points(&self, era: EraIndex) -> Result<BTreeMap<AccountId, u32>> {
        let mut points = BTreeMap::new();
        let value = match self
            .fetch("Staking", "ErasRewardPoints", vec![Value::u128(era.into())])
            .await?
        {
            Some(value) => value,
            None => return Ok(points),
        };
        if let Some(individual) = value.at("individual") {
            for pair in sequence_values(individual) {
                let account = pair.at(0).map(as_account).transpose()?;
                let earned = pair.at(1).and_then(as_u128);
                if let (Some(account), Some(earned)) = (account, earned) {
                    points.insert(account, earned as u32);
                }
            }
        }
        Ok(points)
    }

    async fn era_prefs(&self, era: EraIndex) -> Result<BTreeMap<AccountId, ValidatorPrefs>> {
        let entries = self
            .iter_account_map("Staking", "ErasValidatorPrefs", vec![Value::u128(era.into())])
            .await?;
        entries
            .into_iter()
            .map(|(stash, value)| Ok((stash, prefs_from_value(&value)?)))
            .collect()
    }

    async fn era_slashes(&self, era: EraIndex) -> Result<BTreeMap<AccountId, Stake>> {
        let entries = self
            .iter_account_map("Staking", "ValidatorSlashInEra", vec![Value::u128(era.into())])
            .await?;
        // Value is (Perbill, Balance); the balance is the slashed amount.
        Ok(entries
            .into_iter()
            .filter_map(|(stash, value)| value.at(1).and_then(as_u128).map(|amount| (stash, amount)))
            .collect())
    }

    async fn era_exposure(&self, era: EraIndex) -> Result<BTreeMap<AccountId, Exposure>> {
        let entries = self
            .iter_account_map("Staking", "ErasStakers", vec![Value::u128(era.into())])
            .await?;
        let mut exposures = BTreeMap::new();
        for (stash, value) in entries {
            let mut others = Vec::new();
            if let Some(list) = value.at("others") {
                for entry in sequence_values(list) {
                    let who = entry.at("who").map(as_account).transpose()?;
                    let staked = entry.at("value").and_then(as_u128);
                    if let (Some(who), Some(value)) = (who, staked) {
                        others.push(IndividualExposure { who, value });
                    }
                }
            }
            exposures.insert(
                stash,
                Exposure {
                    total: value.at("total").and_then(as_u128).unwrap_or(0),
                    own: value.at("own").and_then(as_u128).unwrap_or(0),
                    others,
                },
            );
        }
        Ok(exposures)
    }

    async fn identity_of(&self, who: &AccountId) -> Result<Identity> {
        let registration = self
            .fetch("Identity", "IdentityOf", vec![account_key(who)])
            .await?;
        let super_of = self
            .fetch("Identity", "SuperOf", vec![account_key(who)])
            .await?;

        let mut identity = match &registration {
            Some(value) => registration_to_identity(value),
            None => Identity::default(),
        };

        if let Some(super_entry) = super_of {
            if let Some(parent) = super_entry.at(0).and_then(|v| as_account(v).ok()) {
                let parent_registration = self
                    .fetch("Identity", "IdentityOf", vec![account_key(&parent)])
                    .await?;
                if let Some(parent_value) = parent_registration {
                    let parent_identity = registration_to_identity(&parent_value);
                    identity.display_parent = parent_identity.display.clone();
                    // Sub-accounts inherit the parent's judgements.
                    if registration.is_none() {
                        identity.judgements = parent_identity.judgements;
                    }
                }
                if identity.display.is_none() {
                    identity.display = super_entry.at(1).and_then(data_to_string);
                }
                identity.parent = Some(crate::models::validator::to_ss58(&parent));
            }
        }

        Ok(identity)
    }

    async fn max_nominator_rewarded(&self) -> Result<u32> {
        match self
            .constant_u32("Staking", "MaxNominatorRewardedPerValidator")
            .await
        {
            Ok(n) => Ok(n),
            Err(_) => match self.constant_u32("Staking", "MaxExposurePageSize").await {
                Ok(n) => Ok(n),
                Err(e) => {
                    warn!("no nominator-reward constant found ({}), using default", e);
                    Ok(DEFAULT_MAX_NOMINATOR_REWARDED)
                }
            },
        }
    }
}

fn account_key(account: &AccountId) -> Value {
    Value::from_bytes(AsRef::<[u8]>::as_ref(account))
}

fn account_from_key_bytes(key_bytes: &[u8]) -> Result<AccountId> {
    if key_bytes.len() < 32 {
        return Err(RankingError::Decode("storage key shorter than an account".into()));
    }
    let mut raw = [0u8; 32];
    raw.copy_from_slice(&key_bytes[key_bytes.len() - 32..]);
    Ok(AccountId::new(raw))
}

fn as_u128(value: &Decoded) -> Option<u128> {
    match &value.value {
        ValueDef::Primitive(Primitive::U128(n)) => Some(*n),
        _ => None,
    }
}

/// Flatten every primitive byte in a value, in order. AccountId32 and raw
/// byte arrays decode to nested composites of u8 primitives.
fn collect_bytes(value: &Decoded, out: &mut Vec<u8>) {
    match &value.value {
        ValueDef::Primitive(Primitive::U128(n)) => out.push(*n as u8),
        ValueDef::Composite(composite) => {
            for inner in composite.values() {
                collect_bytes(inner, out);
            }
        }
        ValueDef::Variant(variant) => {
            for inner in variant.values.values() {
                collect_bytes(inner, out);
            }
        }
        _ => {}
    }
}

fn as_account(value: &Decoded) -> Result<AccountId> {
    let mut bytes = Vec::with_capacity(32);
    collect_bytes(value, &mut bytes);
    if bytes.len() != 32 {
        return Err(RankingError::Decode(format!(
            "expected a 32-byte account, got {} bytes",
            bytes.len()
        )));
    }
    let mut raw = [0u8; 32];
    raw.copy_from_slice(&bytes);
    Ok(AccountId::new(raw))
}

/// The values of a decoded Vec/BTreeMap/tuple-like composite.
fn sequence_values(value: &Decoded) -> Vec<&Decoded> {
    match &value.value {
        ValueDef::Composite(Composite::Unnamed(values)) => values.iter().collect(),
        ValueDef::Composite(Composite::Named(values)) => {
            values.iter().map(|(_, v)| v).collect()
        }
        _ => Vec::new(),
    }
}

fn prefs_from_value(value: &Decoded) -> Result<ValidatorPrefs> {
    let commission = value
        .at("commission")
        .and_then(as_u128)
        .ok_or_else(|| RankingError::Decode("ValidatorPrefs has no commission".into()))?;
    Ok(ValidatorPrefs {
        commission: commission as u64,
    })
}

/// Identity pallet `Data` values: Raw* variants carry the bytes, hashed
/// variants are treated as absent.
fn data_to_string(value: &Decoded) -> Option<String> {
    if let ValueDef::Variant(variant) = &value.value {
        if variant.name.starts_with("Raw") {
            let mut bytes = Vec::new();
            for inner in variant.values.values() {
                collect_bytes(inner, &mut bytes);
            }
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Flatten a `Registration` (possibly wrapped in a tuple alongside a
/// username, as in recent identity pallets) into the domain `Identity`.
fn registration_to_identity(value: &Decoded) -> Identity {
    let registration = if value.at("info").is_some() {
        value
    } else {
        match value.at(0) {
            Some(inner) if inner.at("info").is_some() => inner,
            _ => value,
        }
    };

    let mut identity = Identity::default();
    if let Some(info) = registration.at("info") {
        identity.display = info.at("display").and_then(data_to_string);
        identity.legal = info.at("legal").and_then(data_to_string);
        identity.web = info.at("web").and_then(data_to_string);
        identity.email = info.at("email").and_then(data_to_string);
        identity.twitter = info.at("twitter").and_then(data_to_string);
        identity.riot = info
            .at("riot")
            .or_else(|| info.at("matrix"))
            .and_then(data_to_string);
    }
    if let Some(judgements) = registration.at("judgements") {
        for pair in sequence_values(judgements) {
            let registrar = pair.at(0).and_then(as_u128).unwrap_or(0) as u32;
            let kind = match pair.at(1) {
                Some(ScaleValue {
                    value: ValueDef::Variant(variant),
                    ..
                }) => match variant.name.as_str() {
                    "FeePaid" => JudgementKind::FeePaid,
                    "Reasonable" => JudgementKind::Reasonable,
                    "KnownGood" => JudgementKind::KnownGood,
                    "OutOfDate" => JudgementKind::OutOfDate,
                    "LowQuality" => JudgementKind::LowQuality,
                    "Erroneous" => JudgementKind::Erroneous,
                    _ => JudgementKind::Unknown,
                },
                _ => JudgementKind::Unknown,
            };
            identity.judgements.push(Judgement { registrar, kind });
        }
    }
    identity
}
