use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::ranking::RankedValidator;
use crate::models::validator::Stake;
use crate::repositories::traits::RankingRepository;

pub struct PostgresRankingRepository {
    pool: PgPool,
}

impl PostgresRankingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RankingRepository for PostgresRankingRepository {
    async fn insert_validator(
        &self,
        v: &RankedValidator,
        block_height: u32,
        timestamp: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ranking (
                rank, name, stash_address, controller_address,
                active, active_rating,
                identity, has_sub_identity, sub_accounts_rating,
                verified_identity, identity_rating,
                stash_created_at_block, stash_parent_created_at_block,
                address_creation_rating,
                nominators, nominators_rating,
                commission, commission_history, commission_rating,
                active_eras, era_points_history, era_points_percent,
                era_points_rating,
                performance, relative_performance,
                slashed, slashes, slash_rating,
                council_backing, active_in_governance, governance_rating,
                payout_history, payout_rating,
                self_stake, total_stake, other_stake,
                included_thousand_validators, thousand_validator,
                part_of_cluster, cluster_name, cluster_members,
                show_cluster_member,
                dominated, total_rating,
                block_height, timestamp
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
                $31, $32, $33, $34::numeric, $35::numeric, $36::numeric,
                $37, $38, $39, $40, $41, $42, $43, $44, $45, $46
            )
            "#,
        )
        .bind(v.rank as i32)
        .bind(&v.name)
        .bind(&v.stash_address)
        .bind(&v.controller_address)
        .bind(v.active)
        .bind(v.active_rating)
        .bind(serde_json::to_value(&v.identity)?)
        .bind(v.has_sub_identity)
        .bind(v.sub_accounts_rating)
        .bind(v.verified_identity)
        .bind(v.identity_rating)
        .bind(v.stash_created_at_block as i64)
        .bind(v.stash_parent_created_at_block.map(|b| b as i64))
        .bind(v.address_creation_rating)
        .bind(v.nominators as i32)
        .bind(v.nominators_rating)
        .bind(v.commission)
        .bind(serde_json::to_value(&v.commission_history)?)
        .bind(v.commission_rating)
        .bind(v.active_eras as i32)
        .bind(serde_json::to_value(&v.era_points_history)?)
        .bind(v.era_points_percent)
        .bind(v.era_points_rating)
        .bind(v.performance)
        .bind(v.relative_performance)
        .bind(v.slashed)
        .bind(serde_json::to_value(&v.slashes)?)
        .bind(v.slash_rating)
        .bind(v.council_backing)
        .bind(v.active_in_governance)
        .bind(v.governance_rating)
        .bind(serde_json::to_value(&v.payout_history)?)
        .bind(v.payout_rating)
        .bind(v.self_stake.to_string())
        .bind(v.total_stake.to_string())
        .bind(v.other_stake.to_string())
        .bind(v.included_thousand_validators)
        .bind(
            v.thousand_validator
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
        )
        .bind(v.part_of_cluster)
        .bind(&v.cluster_name)
        .bind(v.cluster_members as i32)
        .bind(v.show_cluster_member)
        .bind(v.dominated)
        .bind(v.total_rating)
        .bind(block_height as i64)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn purge_other_generations(&self, block_height: u32) -> Result<u64> {
        let result = sqlx::query("DELETE FROM ranking WHERE block_height != $1")
            .bind(block_height as i64)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn update_total(&self, name: &str, count: Stake) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO total (name, count)
            VALUES ($1, $2::numeric)
            ON CONFLICT (name)
            DO UPDATE SET count = EXCLUDED.count
            "#,
        )
        .bind(name)
        .bind(count.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
