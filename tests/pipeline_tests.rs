use async_trait::async_trait;
use mockall::mock;
use sp_core::crypto::AccountId32 as AccountId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use validator_ranking::chain::ChainApi;
use validator_ranking::config::Config;
use validator_ranking::models::identity::Identity;
use validator_ranking::models::ranking::RankedValidator;
use validator_ranking::models::validator::{
    EraIndex, Exposure, IndividualExposure, Nomination, Stake, StakingLedger, ValidatorPrefs,
};
use validator_ranking::repositories::traits::{EventRepository, RankingRepository};
use validator_ranking::services::pipeline::RankingPipeline;
use validator_ranking::utils::errors::Result as ChainResult;

const UNIT: u128 = 1_000_000_000_000;

mock! {
    pub Chain {}
    #[async_trait]
    impl ChainApi for Chain {
        async fn best_block_number(&self) -> ChainResult<u32>;
        async fn active_era(&self) -> ChainResult<EraIndex>;
        async fn current_era(&self) -> ChainResult<EraIndex>;
        async fn history_depth(&self) -> ChainResult<u32>;
        async fn session_validators(&self) -> ChainResult<Vec<AccountId>>;
        async fn validator_entries(&self) -> ChainResult<Vec<(AccountId, ValidatorPrefs)>>;
        async fn controller_of(&self, stash: &AccountId) -> ChainResult<Option<AccountId>>;
        async fn ledger_of(&self, controller: &AccountId) -> ChainResult<Option<StakingLedger>>;
        async fn nominator_entries(&self) -> ChainResult<Vec<Nomination>>;
        async fn council_voters(&self) -> ChainResult<BTreeSet<AccountId>>;
        async fn governance_participants(&self) -> ChainResult<BTreeSet<AccountId>>;
        async fn era_points(&self, era: EraIndex) -> ChainResult<BTreeMap<AccountId, u32>>;
        async fn era_prefs(&self, era: EraIndex) -> ChainResult<BTreeMap<AccountId, ValidatorPrefs>>;
        async fn era_slashes(&self, era: EraIndex) -> ChainResult<BTreeMap<AccountId, Stake>>;
        async fn era_exposure(&self, era: EraIndex) -> ChainResult<BTreeMap<AccountId, Exposure>>;
        async fn identity_of(&self, who: &AccountId) -> ChainResult<Identity>;
        async fn max_nominator_rewarded(&self) -> ChainResult<u32>;
    }
}

mock! {
    pub EventRepo {}
    #[async_trait]
    impl EventRepository for EventRepo {
        async fn first_seen_block(&self, address: &str) -> anyhow::Result<Option<u32>>;
    }
}

mock! {
    pub RankingRepo {}
    #[async_trait]
    impl RankingRepository for RankingRepo {
        async fn insert_validator(
            &self,
            validator: &RankedValidator,
            block_height: u32,
            timestamp: i64,
        ) -> anyhow::Result<()>;
        async fn purge_other_generations(&self, block_height: u32) -> anyhow::Result<u64>;
        async fn update_total(&self, name: &str, count: Stake) -> anyhow::Result<()>;
    }
}

fn account(seed: u8) -> AccountId {
    AccountId::new([seed; 32])
}

fn test_config() -> Config {
    Config {
        history_size: 2,
        eras_per_day: 4,
        token_decimals: 12,
        // Nothing listens here; the fetch must fail fast and non-fatally.
        thousand_validator_url: "http://127.0.0.1:9/candidates".to_string(),
        ..Config::default()
    }
}

/// Chain mock describing one active and one waiting validator across a
/// two-era window at block 1000.
fn mock_chain() -> MockChain {
    let v1 = account(1);
    let v2 = account(2);

    let exposure = Exposure {
        total: 2_000 * UNIT,
        own: 1_000 * UNIT,
        others: vec![IndividualExposure {
            who: account(9),
            value: 1_000 * UNIT,
        }],
    };

    let mut chain = MockChain::new();
    chain.expect_best_block_number().returning(|| Ok(1_000));
    chain.expect_active_era().returning(|| Ok(1));
    chain.expect_current_era().returning(|| Ok(1));
    chain.expect_history_depth().returning(|| Ok(84));
    {
        let v1 = v1.clone();
        chain
            .expect_session_validators()
            .returning(move || Ok(vec![v1.clone()]));
    }
    {
        let (v1, v2) = (v1.clone(), v2.clone());
        chain.expect_validator_entries().returning(move || {
            Ok(vec![
                (v1.clone(), ValidatorPrefs { commission: 70_000_000 }),
                (v2.clone(), ValidatorPrefs { commission: 30_000_000 }),
            ])
        });
    }
    chain
        .expect_controller_of()
        .returning(|stash| Ok(Some(stash.clone())));
    chain.expect_ledger_of().returning(|_| {
        Ok(Some(StakingLedger {
            total: 500 * UNIT,
            claimed_rewards: BTreeSet::new(),
        }))
    });
    {
        let v2 = v2.clone();
        chain.expect_nominator_entries().returning(move || {
            Ok(vec![Nomination {
                nominator: account(8),
                targets: vec![v2.clone()],
            }])
        });
    }
    chain.expect_council_voters().returning(|| Ok(BTreeSet::new()));
    chain
        .expect_governance_participants()
        .returning(|| Ok(BTreeSet::new()));
    {
        let v1 = v1.clone();
        chain
            .expect_era_points()
            .returning(move |_| Ok(BTreeMap::from([(v1.clone(), 10)])));
    }
    chain.expect_era_prefs().returning(|_| Ok(BTreeMap::new()));
    chain.expect_era_slashes().returning(|_| Ok(BTreeMap::new()));
    {
        let v1 = v1.clone();
        chain
            .expect_era_exposure()
            .returning(move |_| Ok(BTreeMap::from([(v1.clone(), exposure.clone())])));
    }
    chain.expect_identity_of().returning(|_| Ok(Identity::default()));
    chain.expect_max_nominator_rewarded().returning(|| Ok(256));
    chain
}

#[tokio::test]
async fn run_persists_one_generation() -> anyhow::Result<()> {
    let chain = mock_chain();

    let mut events = MockEventRepo::new();
    events.expect_first_seen_block().returning(|_| Ok(None));

    let mut ranking = MockRankingRepo::new();
    ranking
        .expect_insert_validator()
        .withf(|validator, block_height, _| {
            *block_height == 1_000 && validator.total_rating == validator.rating_sum()
        })
        .times(2)
        .returning(|_, _, _| Ok(()));
    ranking
        .expect_purge_other_generations()
        .withf(|block_height| *block_height == 1_000)
        .times(1)
        .returning(|_| Ok(3));
    ranking.expect_update_total().times(5).returning(|_, _| Ok(()));

    let pipeline = RankingPipeline::new(
        Arc::new(chain),
        Arc::new(events),
        Arc::new(ranking),
        test_config(),
    );

    pipeline.execute().await
}

/// A thousand-validator outage must not sink the run; every row is
/// written with the inclusion flag off.
#[tokio::test]
async fn thousand_validator_outage_is_non_fatal() -> anyhow::Result<()> {
    let chain = mock_chain();

    let mut events = MockEventRepo::new();
    events.expect_first_seen_block().returning(|_| Ok(None));

    let mut ranking = MockRankingRepo::new();
    ranking
        .expect_insert_validator()
        .withf(|validator, _, _| {
            !validator.included_thousand_validators && validator.thousand_validator.is_none()
        })
        .times(2)
        .returning(|_, _, _| Ok(()));
    ranking
        .expect_purge_other_generations()
        .times(1)
        .returning(|_| Ok(0));
    ranking.expect_update_total().times(5).returning(|_, _| Ok(()));

    let pipeline = RankingPipeline::new(
        Arc::new(chain),
        Arc::new(events),
        Arc::new(ranking),
        test_config(),
    );

    pipeline.execute().await
}

/// A failing row insert is skipped; the rest of the generation and the
/// totals still land.
#[tokio::test]
async fn row_insert_failure_does_not_abort() -> anyhow::Result<()> {
    let chain = mock_chain();

    let mut events = MockEventRepo::new();
    events.expect_first_seen_block().returning(|_| Ok(None));

    let mut ranking = MockRankingRepo::new();
    let mut calls = 0;
    ranking
        .expect_insert_validator()
        .times(2)
        .returning(move |_, _, _| {
            calls += 1;
            if calls == 1 {
                Err(anyhow::anyhow!("duplicate key"))
            } else {
                Ok(())
            }
        });
    ranking
        .expect_purge_other_generations()
        .times(1)
        .returning(|_| Ok(0));
    ranking.expect_update_total().times(5).returning(|_, _| Ok(()));

    let pipeline = RankingPipeline::new(
        Arc::new(chain),
        Arc::new(events),
        Arc::new(ranking),
        test_config(),
    );

    pipeline.execute().await
}

/// An RPC failure aborts the run before anything is written.
#[tokio::test]
async fn rpc_failure_aborts_run() {
    let mut chain = MockChain::new();
    chain.expect_active_era().returning(|| {
        Err(validator_ranking::utils::errors::RankingError::Rpc(
            "connection reset".into(),
        ))
    });
    chain.expect_history_depth().returning(|| Ok(84));

    let mut events = MockEventRepo::new();
    events.expect_first_seen_block().never();

    let mut ranking = MockRankingRepo::new();
    ranking.expect_insert_validator().never();
    ranking.expect_purge_other_generations().never();
    ranking.expect_update_total().never();

    let pipeline = RankingPipeline::new(
        Arc::new(chain),
        Arc::new(events),
        Arc::new(ranking),
        test_config(),
    );

    assert!(pipeline.execute().await.is_err());
}
