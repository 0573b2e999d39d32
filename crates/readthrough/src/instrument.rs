//! Instrumentation decorators over any [`Source`].
//!
//! Each decorator wraps a `Source` and is itself a `Source`, so they stack in
//! any order around either the raw source or the cache:
//!
//! ```no_run
//! # use std::time::Duration;
//! # use futures::future::BoxFuture;
//! # use readthrough::{Cache, CacheConfig, FetchResult, Source};
//! # use readthrough::instrument::{Logged, Timed, Traced};
//! # struct Backend;
//! # impl Source for Backend {
//! #     fn fetch(&self, id: u64) -> BoxFuture<'_, FetchResult> {
//! #         Box::pin(async move { Ok(format!("record #{id}")) })
//! #     }
//! # }
//! # #[tokio::main]
//! # async fn main() {
//! let source = Logged::new(Timed::new(Backend));
//! let cache = Traced::new(Cache::new(source, CacheConfig::default()).unwrap());
//! # let _ = cache.fetch(1).await;
//! # }
//! ```

use std::time::Instant;

use futures::future::BoxFuture;
use tracing::Instrument;

use crate::source::{FetchResult, Source};

/// Emits a `fetch.duration` timer for every fetch, tagged with
/// `result:success` or `result:error`.
///
/// Timings go through the [`metric!`](crate::metric) machinery and are
/// dropped silently when statsd is not configured.
pub struct Timed<S> {
    inner: S,
}

impl<S> Timed<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Timed { inner }
    }
}

impl<S: Source> Source for Timed<S> {
    fn fetch(&self, id: u64) -> BoxFuture<'_, FetchResult> {
        Box::pin(async move {
            let start = Instant::now();
            let result = self.inner.fetch(id).await;
            let status = if result.is_ok() { "success" } else { "error" };
            metric!(timer("fetch.duration") = start.elapsed(), "result" => status);
            result
        })
    }
}

/// Wraps every fetch in a `tracing` span carrying the id, recording the error
/// on failure.
pub struct Traced<S> {
    inner: S,
}

impl<S> Traced<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Traced { inner }
    }
}

impl<S: Source> Source for Traced<S> {
    fn fetch(&self, id: u64) -> BoxFuture<'_, FetchResult> {
        let span = tracing::info_span!("fetch", id, error = tracing::field::Empty);
        Box::pin(
            async move {
                let result = self.inner.fetch(id).await;
                if let Err(err) = &result {
                    tracing::Span::current().record("error", tracing::field::display(err));
                }
                result
            }
            .instrument(span),
        )
    }
}

/// Emits a structured error log for every failed fetch.
pub struct Logged<S> {
    inner: S,
}

impl<S> Logged<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Logged { inner }
    }
}

impl<S: Source> Source for Logged<S> {
    fn fetch(&self, id: u64) -> BoxFuture<'_, FetchResult> {
        Box::pin(async move {
            let result = self.inner.fetch(id).await;
            if let Err(err) = &result {
                tracing::error!(id, error = %err, "fetch failed");
            }
            result
        })
    }
}
