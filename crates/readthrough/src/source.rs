use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::FetchError;

/// The result of a single fetch, either from a [`Source`] or from the cache.
pub type FetchResult = Result<String, FetchError>;

/// Produces the authoritative value for an id.
///
/// This is the single seam between the cache and the expensive lookup it
/// memoizes, and it is also the shape of the cache itself: `Cache` implements
/// `Source`, so instrumentation layers from [`instrument`](crate::instrument)
/// can wrap either side without touching the engine.
///
/// A successful fetch is cached and shared with every concurrent caller for
/// the same id; a failed fetch is returned verbatim and never cached.
pub trait Source: Send + Sync {
    /// Fetches the value for `id`.
    fn fetch(&self, id: u64) -> BoxFuture<'_, FetchResult>;
}

impl<S: Source + ?Sized> Source for Arc<S> {
    fn fetch(&self, id: u64) -> BoxFuture<'_, FetchResult> {
        (**self).fetch(id)
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn fetch(&self, id: u64) -> BoxFuture<'_, FetchResult> {
        (**self).fetch(id)
    }
}
