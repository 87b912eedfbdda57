use anyhow::Result;
use async_trait::async_trait;

use crate::models::ranking::RankedValidator;
use crate::models::validator::Stake;

/// Read side of the block-crawler's `event` table.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Earliest block at which a `NewAccount` event references the address.
    /// `None` means the address is genesis-present.
    async fn first_seen_block(&self, address: &str) -> Result<Option<u32>>;
}

/// Write side of the materialized ranking.
#[async_trait]
pub trait RankingRepository: Send + Sync {
    async fn insert_validator(
        &self,
        validator: &RankedValidator,
        block_height: u32,
        timestamp: i64,
    ) -> Result<()>;

    /// Drop every generation except the given block height. Returns the
    /// number of rows removed.
    async fn purge_other_generations(&self, block_height: u32) -> Result<u64>;

    async fn update_total(&self, name: &str, count: Stake) -> Result<()>;
}
