use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::cache::Shared;

/// Floor on the pause between two sweeps. The deadline reported for a
/// placeholder parked at the tail can already be in the past when its load
/// has outlived the ttl; sleeping at least this long keeps the loop from
/// spinning until that load resolves.
const MIN_PAUSE: Duration = Duration::from_millis(10);

/// Owns the background reclaimer task and aborts it on drop, so the task does
/// not outlive the last cache handle.
pub(crate) struct ReclaimerHandle {
    task: JoinHandle<()>,
}

impl ReclaimerHandle {
    pub(crate) fn spawn(shared: Arc<Shared>) -> Self {
        ReclaimerHandle {
            task: tokio::spawn(run(shared)),
        }
    }
}

impl Drop for ReclaimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The reclaimer loop: sweep idle-expired entries, then sleep until the next
/// plausible expiry, or park while the cache is empty.
///
/// The sweep walks the recency list from the least recently used end and
/// stops at the first survivor, so the order mutex is held only for the
/// expired suffix. An entry whose idle clock was refreshed between two sweeps
/// simply postpones its expiry to a later pass. Placeholders are never
/// reclaimed; a load in flight shields itself and everything fresher.
async fn run(shared: Arc<Shared>) {
    let mut expired = Vec::new();
    loop {
        let deadline = {
            let mut order = shared.order.lock();
            let deadline = order.expire_idle(shared.epoch, shared.ttl, Instant::now(), &mut expired);
            for id in expired.drain(..) {
                shared.by_key.remove(&id);
                metric!(counter("cache.expired") += 1);
                tracing::trace!(id, "removed idle entry");
            }
            metric!(gauge("cache.entries") = order.len() as u64);
            deadline
        };

        match deadline {
            Some(deadline) => {
                let wake_at = deadline.max(Instant::now() + MIN_PAUSE);
                tokio::time::sleep_until(wake_at.into()).await;
            }
            // Empty cache: park until the next admit. The permit stored by
            // `notify_one` makes this race-free against a signal sent before
            // we get here.
            None => shared.nonempty.notified().await,
        }
    }
}
