use anyhow::Result;
use futures::{stream, StreamExt};
use sp_core::crypto::AccountId32 as AccountId;
use std::collections::BTreeMap;

use crate::models::validator::{to_ss58, AccountAge, ValidatorRecord};
use crate::repositories::traits::EventRepository;

/// Parallel lookups against the event table; reads only, never
/// interleaved with writes.
const LOOKUP_CONCURRENCY: usize = 8;

/// Resolve the first-seen block of every stash and, where a sub-identity
/// exists, of its parent account. Addresses without a `NewAccount` event
/// are genesis-present and resolve to block zero.
pub async fn resolve_account_ages(
    events: &dyn EventRepository,
    validators: &[ValidatorRecord],
) -> Result<BTreeMap<AccountId, AccountAge>> {
    let lookups = validators.iter().map(|record| {
        let stash = record.stash.clone();
        let parent = record.identity.parent.clone();
        async move {
            let stash_created_at = events
                .first_seen_block(&to_ss58(&stash))
                .await?
                .unwrap_or(0);
            let parent_created_at = match parent {
                Some(parent) => Some(events.first_seen_block(&parent).await?.unwrap_or(0)),
                None => None,
            };
            Ok::<_, anyhow::Error>((
                stash,
                AccountAge {
                    stash_created_at,
                    parent_created_at,
                },
            ))
        }
    });

    let resolved = stream::iter(lookups)
        .buffered(LOOKUP_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut ages = BTreeMap::new();
    for entry in resolved {
        let (stash, age) = entry?;
        ages.insert(stash, age);
    }
    Ok(ages)
}
