use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::observability;
use crate::scheduler::Scheduler;

const CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Background task that rewrites the journal once `threshold` appends have
/// piled up since the last compaction.
pub async fn run_compactor(scheduler: Arc<Scheduler>, threshold: u64) {
    let mut interval = tokio::time::interval(CHECK_INTERVAL);
    loop {
        interval.tick().await;
        compact_if_due(&scheduler, threshold).await;
    }
}

/// Returns whether a compaction ran.
pub async fn compact_if_due(scheduler: &Scheduler, threshold: u64) -> bool {
    let appends = scheduler.appends_since_compact().await;
    if appends < threshold {
        debug!("compactor skip: {appends}/{threshold} appends");
        return false;
    }
    match scheduler.compact().await {
        Ok(events) => {
            metrics::counter!(observability::COMPACTIONS_TOTAL).increment(1);
            info!("compacted journal: {appends} appends folded into {events} events");
            true
        }
        Err(e) => {
            warn!("compaction failed: {e}");
            false
        }
    }
}
