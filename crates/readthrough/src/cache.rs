use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::config::CacheConfig;
use crate::entry::Entry;
use crate::error::ConfigError;
use crate::recency::RecencyList;
use crate::reclaimer::ReclaimerHandle;
use crate::source::{FetchResult, Source};

/// State shared between the cache handles and the reclaimer task.
pub(crate) struct Shared {
    /// Lock-free presence index for the hit path. Every write happens while
    /// holding [`order`](Self::order), so a read taken under that mutex is
    /// authoritative and the two structures stay in bijection.
    pub(crate) by_key: DashMap<u64, Arc<Entry>>,
    /// The coarse index mutex, guarding the recency ordering and serializing
    /// all admits, evictions and removals. Never held across a source call
    /// or a latch acquisition.
    pub(crate) order: Mutex<RecencyList>,
    /// Wakes the reclaimer after an admit into an empty cache. The stored
    /// permit means a signal sent before the reclaimer parks is not lost.
    pub(crate) nonempty: Notify,
    pub(crate) source: Arc<dyn Source>,
    pub(crate) ttl: Duration,
    pub(crate) capacity: usize,
    /// Reference instant for the per-entry atomic access timestamps.
    pub(crate) epoch: Instant,
}

/// A concurrent read-through cache over a [`Source`].
///
/// Cloning is cheap and every clone operates on the same cache. The
/// background reclaimer task stops when the last clone is dropped.
///
/// See the [crate docs](crate) for the full behavior.
#[derive(Clone)]
pub struct Cache {
    shared: Arc<Shared>,
    /// Aborts the reclaimer task when the last clone drops.
    _reclaimer: Arc<ReclaimerHandle>,
}

impl Cache {
    /// Creates a cache over `source` and spawns its reclaimer task.
    ///
    /// Must be called from within a tokio runtime. Fails fast if the config
    /// is unusable (`capacity` of zero or a zero `ttl`).
    pub fn new(source: impl Source + 'static, config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let shared = Arc::new(Shared {
            by_key: DashMap::new(),
            order: Mutex::new(RecencyList::new()),
            nonempty: Notify::new(),
            source: Arc::new(source),
            ttl: config.ttl,
            capacity: config.capacity,
            epoch: Instant::now(),
        });
        let reclaimer = Arc::new(ReclaimerHandle::spawn(Arc::clone(&shared)));
        Ok(Cache {
            shared,
            _reclaimer: reclaimer,
        })
    }

    /// Returns the cached value for `id`, fetching it from the source on a
    /// miss.
    ///
    /// Concurrent calls for the same id are coalesced into a single source
    /// call. A source error is returned verbatim and not cached; the next
    /// call for the id will fetch again.
    pub async fn fetch(&self, id: u64) -> FetchResult {
        let shared = &*self.shared;
        metric!(counter("cache.access") += 1);

        loop {
            // Optimistic probe, off the order mutex. A stale miss is fine:
            // the admit path below re-checks under the lock. The shard guard
            // is dropped before the mutex is taken.
            let resident = shared.by_key.get(&id).map(|e| Arc::clone(e.value()));

            if let Some(entry) = &resident {
                if let Some(value) = entry.value() {
                    entry.touch(shared.epoch, Instant::now());
                    shared.order.lock().move_to_front(id, entry);
                    metric!(counter("cache.hit") += 1);
                    return Ok(value.clone());
                }
            }

            let entry = self.admit_or_join(id);

            // Contend on the build latch. Exactly one caller finds the entry
            // neither ready nor defunct and performs the load; everyone else
            // wakes to the published value or re-drives.
            let mut latch = entry.latch().lock().await;

            if let Some(value) = entry.value() {
                entry.touch(shared.epoch, Instant::now());
                metric!(counter("cache.hit") += 1);
                return Ok(value.clone());
            }

            if latch.defunct {
                // The load failed and the placeholder was unlinked while we
                // were parked; start over with a fresh admit cycle.
                drop(latch);
                continue;
            }

            metric!(counter("cache.miss") += 1);
            tracing::trace!(id, "fetching from source");

            match shared.source.fetch(id).await {
                Ok(value) => {
                    entry.publish(value.clone());
                    entry.touch(shared.epoch, Instant::now());
                    return Ok(value);
                }
                Err(err) => {
                    // Roll the placeholder back so the failure is not cached.
                    // The identity check covers an eviction that already
                    // displaced this entry while the load was in flight.
                    latch.defunct = true;
                    let mut order = shared.order.lock();
                    if order.remove(id, &entry) {
                        shared.by_key.remove(&id);
                    }
                    drop(order);
                    tracing::debug!(id, error = %err, "source fetch failed, entry dropped");
                    return Err(err);
                }
            }
        }
    }

    /// Re-checks the index under the order mutex, joining the resident entry
    /// or admitting a fresh placeholder (evicting the LRU entry if full).
    fn admit_or_join(&self, id: u64) -> Arc<Entry> {
        let shared = &*self.shared;
        let mut order = shared.order.lock();

        // Authoritative re-check: index writes only happen under this mutex.
        if let Some(resident) = shared.by_key.get(&id) {
            return Arc::clone(resident.value());
        }

        if order.len() >= shared.capacity {
            if let Some(victim) = order.pop_back() {
                shared.by_key.remove(&victim.id());
                metric!(counter("cache.eviction") += 1);
                tracing::trace!(id = victim.id(), "evicted least recently used entry");
            }
        }

        let was_empty = order.is_empty();
        let entry = Arc::new(Entry::new(id, shared.epoch, Instant::now()));
        shared.by_key.insert(id, Arc::clone(&entry));
        order.push_front(Arc::clone(&entry));
        if was_empty {
            shared.nonempty.notify_one();
        }
        entry
    }

    /// Number of resident entries, including in-flight placeholders.
    ///
    /// Never exceeds the configured capacity; under concurrent use the value
    /// is naturally a snapshot.
    pub fn len(&self) -> usize {
        self.shared.order.lock().len()
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Source for Cache {
    fn fetch(&self, id: u64) -> BoxFuture<'_, FetchResult> {
        Box::pin(Cache::fetch(self, id))
    }
}
