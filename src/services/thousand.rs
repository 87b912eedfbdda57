use anyhow::Result;
use std::time::Duration;
use tracing::warn;

use crate::models::ranking::ThousandValidatorRecord;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch the thousand-validator programme candidate list. Failure is
/// non-fatal: the run proceeds with an empty list and no validator is
/// flagged as included.
pub async fn fetch_candidates(url: &str) -> Vec<ThousandValidatorRecord> {
    match try_fetch(url).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(error = %e, url, "thousand-validator fetch failed, using empty list");
            Vec::new()
        }
    }
}

async fn try_fetch(url: &str) -> Result<Vec<ThousandValidatorRecord>> {
    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
    let candidates = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(candidates)
}
