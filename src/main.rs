use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use validator_ranking::chain::SubstrateApi;
use validator_ranking::config::Config;
use validator_ranking::repositories::postgres::{
    create_pool, PostgresEventRepository, PostgresRankingRepository,
};
use validator_ranking::services::pipeline::RankingPipeline;
use validator_ranking::services::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load()?;
    tracing::info!(
        ws = %config.ws_provider_url,
        database = %config.sanitized_database_url(),
        history_size = config.history_size,
        polling_time_ms = config.polling_time_ms,
        "starting validator ranking service"
    );

    let pool = create_pool(&config.database_url, config.max_connections).await?;
    let chain = SubstrateApi::connect(&config.ws_provider_url).await?;

    let pipeline = RankingPipeline::new(
        Arc::new(chain),
        Arc::new(PostgresEventRepository::new(pool.clone())),
        Arc::new(PostgresRankingRepository::new(pool)),
        config.clone(),
    );

    Scheduler::new(pipeline, config.start_delay_ms, config.polling_time_ms)
        .run()
        .await;

    Ok(())
}
