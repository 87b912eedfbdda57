mod event_repository;
mod ranking_repository;

pub use event_repository::PostgresEventRepository;
pub use ranking_repository::PostgresRankingRepository;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn create_pool(database_url: &str, max_connections: u32) -> sqlx::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
