use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// A single cached key, shared between the index, the recency list and every
/// caller currently interested in it.
///
/// An entry starts out as a placeholder: the value slot is empty and the
/// caller that admitted it (or the first one to win the latch) performs the
/// source call while holding the latch. Publishing the value flips the entry
/// to ready exactly once; there is no way back.
pub(crate) struct Entry {
    id: u64,
    /// The materialized value. Empty until the load completes successfully;
    /// readable lock-free on the hit path.
    value: OnceLock<String>,
    /// Microseconds since the cache epoch of the most recent admit or hit.
    /// Written atomically so the hit path never takes the latch; the
    /// reclaimer reads it under the order mutex and tolerates either side of
    /// a racing touch.
    last_access: AtomicU64,
    /// The build latch. Held across the source call by the loader; joiners
    /// park on it and wake to either the published value or a defunct
    /// placeholder.
    latch: Mutex<LatchState>,
}

/// State protected by the build latch.
#[derive(Default)]
pub(crate) struct LatchState {
    /// Set by a loader whose source call failed, after unlinking the entry
    /// from the index. Joiners that wake to this re-enter the admit path
    /// instead of loading into a dead placeholder.
    pub(crate) defunct: bool,
}

impl Entry {
    pub(crate) fn new(id: u64, epoch: Instant, now: Instant) -> Self {
        let entry = Entry {
            id,
            value: OnceLock::new(),
            last_access: AtomicU64::new(0),
            latch: Mutex::new(LatchState::default()),
        };
        entry.touch(epoch, now);
        entry
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn value(&self) -> Option<&String> {
        self.value.get()
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.value.get().is_some()
    }

    /// Publishes the loaded value, flipping the entry to ready.
    ///
    /// Only the latch holder may call this, and only once per entry.
    pub(crate) fn publish(&self, value: String) {
        let published = self.value.set(value).is_ok();
        debug_assert!(published, "value published twice for id {}", self.id);
    }

    /// Restarts the idle clock.
    pub(crate) fn touch(&self, epoch: Instant, now: Instant) {
        let offset = now.saturating_duration_since(epoch).as_micros() as u64;
        self.last_access.store(offset, Ordering::Relaxed);
    }

    pub(crate) fn last_access(&self, epoch: Instant) -> Instant {
        let offset = self.last_access.load(Ordering::Relaxed);
        epoch + Duration::from_micros(offset)
    }

    pub(crate) fn latch(&self) -> &Mutex<LatchState> {
        &self.latch
    }
}
