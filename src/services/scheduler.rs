use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use crate::services::pipeline::RankingPipeline;

/// Periodic driver: one run at a time, every error contained, the next
/// run always re-armed.
pub struct Scheduler {
    pipeline: RankingPipeline,
    start_delay: Duration,
    polling_time: Duration,
}

impl Scheduler {
    pub fn new(pipeline: RankingPipeline, start_delay_ms: u64, polling_time_ms: u64) -> Self {
        Self {
            pipeline,
            start_delay: Duration::from_millis(start_delay_ms),
            polling_time: Duration::from_millis(polling_time_ms),
        }
    }

    pub async fn run(&self) {
        if !self.start_delay.is_zero() {
            info!(delay_ms = self.start_delay.as_millis() as u64, "waiting before first run");
            sleep(self.start_delay).await;
        }

        loop {
            info!("starting ranking run");
            if let Err(e) = self.pipeline.execute().await {
                error!(error = format!("{:#}", e), "ranking run failed");
            }
            sleep(self.polling_time).await;
        }
    }
}
