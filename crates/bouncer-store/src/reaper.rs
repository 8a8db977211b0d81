use std::time::Duration;

use bouncer_core::Timestamp;
use tracing::{debug, warn};

use crate::Store;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const AUDIT_RETENTION_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Background TTL sweep (spec §4.4, §5): times out overdue pending requests,
/// expires trust/grant sessions past their TTL, and reaps rows past their
/// retention window. Runs until `shutdown` resolves.
///
/// Mirrors the one-loop-per-concern shape of `astrid-storage`'s embedded
/// maintenance tasks: a single ticker, independent sweeps, errors logged and
/// skipped rather than aborting the loop.
pub async fn run_ttl_reaper(store: Store, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep_once(&store).await;
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!("ttl reaper shutting down");
                    return;
                }
            }
        }
    }
}

async fn sweep_once(store: &Store) {
    let now = Timestamp::now();

    match store.requests().sweep_timeouts(now).await {
        Ok(count) if count > 0 => debug!(count, "timed out overdue pending requests"),
        Ok(_) => {}
        Err(error) => warn!(%error, "request timeout sweep failed"),
    }

    match store.requests().reap_expired(now).await {
        Ok(count) if count > 0 => debug!(count, "reaped expired request rows"),
        Ok(_) => {}
        Err(error) => warn!(%error, "request reap failed"),
    }

    match store.trust_sessions().reap_expired(now).await {
        Ok(count) if count > 0 => debug!(count, "reaped expired trust sessions"),
        Ok(_) => {}
        Err(error) => warn!(%error, "trust session reap failed"),
    }

    match store.grant_sessions().sweep_expirations(now).await {
        Ok(count) if count > 0 => debug!(count, "expired grant sessions"),
        Ok(_) => {}
        Err(error) => warn!(%error, "grant session sweep failed"),
    }

    match store.output_pages().reap_expired(now).await {
        Ok(count) if count > 0 => debug!(count, "reaped expired output pages"),
        Ok(_) => {}
        Err(error) => warn!(%error, "output page reap failed"),
    }

    let audit_cutoff = now.plus_seconds(-AUDIT_RETENTION_SECONDS);
    match store.audit_log().reap_older_than(audit_cutoff).await {
        Ok(count) if count > 0 => debug!(count, "reaped stale audit log entries"),
        Ok(_) => {}
        Err(error) => warn!(%error, "audit log reap failed"),
    }

    match store.upload_batches().reap_expired(now).await {
        Ok(count) if count > 0 => debug!(count, "reaped expired upload batches"),
        Ok(_) => {}
        Err(error) => warn!(%error, "upload batch reap failed"),
    }
}
