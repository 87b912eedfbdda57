use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::repositories::traits::EventRepository;

pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn first_seen_block(&self, address: &str) -> Result<Option<u32>> {
        // The crawler serializes event payloads as JSON text; a substring
        // match on the address is the lookup the schema supports.
        let block: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT block_number
            FROM event
            WHERE method = 'NewAccount' AND data LIKE $1
            ORDER BY block_number ASC
            LIMIT 1
            "#,
        )
        .bind(format!("%{}%", address))
        .fetch_optional(&self.pool)
        .await?;

        Ok(block.map(|b| b as u32))
    }
}
