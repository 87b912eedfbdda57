use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

use crate::chain::{collect_snapshot, ChainApi, Snapshot};
use crate::config::Config;
use crate::models::ranking::RankedValidator;
use crate::models::validator::Stake;
use crate::repositories::traits::{EventRepository, RankingRepository};
use crate::services::{age, cluster, dominance, scorer::Scorer, thousand};

/// One end-to-end ranking run: snapshot, score, analyze, persist.
pub struct RankingPipeline {
    chain: Arc<dyn ChainApi>,
    events: Arc<dyn EventRepository>,
    ranking: Arc<dyn RankingRepository>,
    config: Config,
}

impl RankingPipeline {
    pub fn new(
        chain: Arc<dyn ChainApi>,
        events: Arc<dyn EventRepository>,
        ranking: Arc<dyn RankingRepository>,
        config: Config,
    ) -> Self {
        Self {
            chain,
            events,
            ranking,
            config,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let started_at = Utc::now().timestamp_millis();
        let span = info_span!("ranking_run");
        async move {
            let snapshot = collect_snapshot(self.chain.as_ref(), self.config.history_size)
                .instrument(info_span!("snapshot"))
                .await?;

            let candidates = thousand::fetch_candidates(&self.config.thousand_validator_url)
                .instrument(info_span!("thousand_validators"))
                .await;

            let ages = age::resolve_account_ages(self.events.as_ref(), &snapshot.validators)
                .instrument(info_span!("account_ages"))
                .await?;

            let mut ranked = Scorer::new(
                &snapshot,
                &ages,
                &candidates,
                self.config.eras_per_day,
                self.config.token_decimals,
            )
            .score_all();

            let clusters = cluster::analyze(&mut ranked, &mut rand::thread_rng());
            dominance::mark_dominated(&mut ranked);

            self.persist(&snapshot, &ranked, started_at).await?;

            info!(
                validators = ranked.len(),
                clusters = clusters.len(),
                block_height = snapshot.block_height,
                "ranking run complete"
            );
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn persist(
        &self,
        snapshot: &Snapshot,
        ranked: &[RankedValidator],
        started_at: i64,
    ) -> Result<()> {
        // Row failures are logged and skipped so one malformed record
        // cannot sink the whole generation.
        for validator in ranked {
            if let Err(e) = self
                .ranking
                .insert_validator(validator, snapshot.block_height, started_at)
                .await
            {
                error!(
                    stash = %validator.stash_address,
                    error = %e,
                    "failed to insert ranking row, skipping"
                );
            }
        }

        let purged = self
            .ranking
            .purge_other_generations(snapshot.block_height)
            .await?;
        if purged > 0 {
            info!(purged, "previous ranking generations removed");
        }

        let active = ranked.iter().filter(|v| v.active).count() as Stake;
        let waiting = ranked.len() as Stake - active;
        let totals: [(&str, Stake); 5] = [
            ("active_validator_count", active),
            ("waiting_validator_count", waiting),
            ("nominator_count", snapshot.nominations.len() as Stake),
            ("current_era", snapshot.current_era as Stake),
            ("minimum_stake", minimum_nominator_stake(snapshot)),
        ];
        for (name, count) in totals {
            if let Err(e) = self.ranking.update_total(name, count).await {
                error!(total = name, error = %e, "failed to update total, skipping");
            }
        }

        Ok(())
    }
}

/// Smallest single nominator contribution across all active exposures.
fn minimum_nominator_stake(snapshot: &Snapshot) -> Stake {
    snapshot
        .validators
        .iter()
        .filter(|record| record.active)
        .filter_map(|record| record.exposure.as_ref())
        .flat_map(|exposure| exposure.others.iter())
        .map(|other| other.value)
        .min()
        .unwrap_or(0)
}
