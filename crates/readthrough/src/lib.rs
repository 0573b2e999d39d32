//! # Readthrough
//!
//! An in-process, concurrent, read-through cache that memoizes an expensive
//! lookup keyed by an integer id. The cache composes three disciplines that
//! are easy to get wrong when combined:
//!
//! - **Request coalescing**: at most one concurrent lookup per key reaches the
//!   backing [`Source`]; every other concurrent caller for that key observes
//!   the same result.
//! - **Bounded LRU eviction**: the cache never holds more than `capacity`
//!   entries; admitting a new key at capacity evicts the least recently used
//!   one.
//! - **Idle-TTL expiry**: a background reclaimer task removes entries that
//!   have not been accessed for longer than `ttl`, sleeping until the next
//!   plausible expiry and parking entirely while the cache is empty.
//!
//! A lookup goes through the following steps:
//! - First, an optimistic probe of the key index, taken without the coarse
//!   lock. A ready entry is returned immediately and moved to the
//!   most-recently-used position.
//! - On miss, the caller re-checks under the coarse lock and either joins an
//!   in-flight load for the key or inserts a placeholder (evicting the LRU
//!   entry if the cache is full).
//! - The caller then contends on the placeholder's own latch. Exactly one
//!   caller performs the [`Source::fetch`] call; the rest wake to the
//!   published value.
//! - A failed load is never cached: the placeholder is unlinked and the
//!   source's error is returned verbatim to the caller that performed the
//!   load.
//!
//! ## Instrumentation
//!
//! The cache itself implements [`Source`], so the decorators in
//! [`instrument`] can wrap either the cache or the raw source:
//!
//! - [`instrument::Timed`] emits a `fetch.duration` timer tagged with
//!   `result:success` or `result:error`.
//! - [`instrument::Traced`] wraps each fetch in a `tracing` span carrying the
//!   id, recording the error on failure.
//! - [`instrument::Logged`] emits a structured error log for failed fetches.
//!
//! The engine emits the following metrics through the [`metric!`] macro (all
//! no-ops until [`metrics::configure_statsd`] is called):
//!
//! - `cache.access`: all lookups.
//! - `cache.hit`: lookups served from a resident, ready entry.
//! - `cache.miss`: lookups that performed a source call.
//! - `cache.eviction`: entries displaced by LRU eviction.
//! - `cache.expired`: entries removed by the idle-TTL reclaimer.
//! - `cache.entries`: gauge of resident entries, reported after each sweep.
//!
//! ## Configuration
//!
//! Exactly two knobs, both carried by [`CacheConfig`]: `capacity` (must be at
//! least 1) and `ttl` (must be positive). Both are validated by
//! [`Cache::new`], which fails fast with a [`ConfigError`] instead of
//! constructing a cache that can never behave sensibly.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use futures::future::BoxFuture;
//! use readthrough::{Cache, CacheConfig, FetchResult, Source};
//!
//! struct Backend;
//!
//! impl Source for Backend {
//!     fn fetch(&self, id: u64) -> BoxFuture<'_, FetchResult> {
//!         Box::pin(async move { Ok(format!("record #{id}")) })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = CacheConfig {
//!         capacity: 10_000,
//!         ttl: Duration::from_secs(300),
//!     };
//!     let cache = Cache::new(Backend, config).unwrap();
//!
//!     let value = cache.fetch(42).await.unwrap();
//!     assert_eq!(value, "record #42");
//! }
//! ```

#![warn(missing_docs)]

#[macro_use]
pub mod metrics;

mod cache;
mod config;
mod entry;
mod error;
pub mod instrument;
pub mod logging;
mod recency;
mod reclaimer;
mod source;

pub use cache::Cache;
pub use config::CacheConfig;
pub use error::{ConfigError, FetchError};
pub use source::{FetchResult, Source};
