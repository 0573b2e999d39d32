//! Helpers for testing the cache: logging setup and a scriptable source with
//! call accounting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use readthrough::{FetchResult, Source};

/// Initializes logging for a test.
///
/// Keeps the subscriber alive for the rest of the process; calling this from
/// multiple tests is fine, only the first call wins.
pub fn setup() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}

type Script = dyn Fn(u64, usize) -> FetchResult + Send + Sync;

/// A [`Source`] driven by a script, with call accounting.
///
/// The script receives the id and the zero-based ordinal of the call *for
/// that id*, so tests can express things like "fail the first call, succeed
/// afterwards". The fixture tracks total and per-id call counts and the
/// high-water mark of concurrently running fetches.
pub struct TestSource {
    script: Box<Script>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<u64, usize>>,
    total_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl TestSource {
    /// Creates a source that answers according to `script`.
    pub fn new(script: impl Fn(u64, usize) -> FetchResult + Send + Sync + 'static) -> Self {
        TestSource {
            script: Box::new(script),
            delay: None,
            calls: Mutex::new(HashMap::new()),
            total_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// A source answering `"test"` for every id.
    pub fn constant(value: &str) -> Self {
        let value = value.to_owned();
        Self::new(move |_, _| Ok(value.clone()))
    }

    /// A source answering `"test{id}"` for every id.
    pub fn keyed() -> Self {
        Self::new(|id, _| Ok(format!("test{id}")))
    }

    /// Makes every fetch take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total number of fetches across all ids.
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Number of fetches for `id`.
    pub fn calls_for(&self, id: u64) -> usize {
        self.calls.lock().get(&id).copied().unwrap_or(0)
    }

    /// The highest number of fetches that were ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Source for TestSource {
    fn fetch(&self, id: u64) -> BoxFuture<'_, FetchResult> {
        Box::pin(async move {
            let nth = {
                let mut calls = self.calls.lock();
                let nth = calls.entry(id).or_insert(0);
                let current = *nth;
                *nth += 1;
                current
            };
            self.total_calls.fetch_add(1, Ordering::SeqCst);

            let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            (self.script)(id, nth)
        })
    }
}
