use std::time::Duration;

use thiserror::Error;

/// An error produced by a [`Source`](crate::Source) while fetching a value.
///
/// The cache never interprets these beyond treating every variant as a failed
/// load: the error is returned to the caller verbatim and the placeholder
/// entry is removed, so the failure is never cached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The id does not exist at the source.
    #[error("not found")]
    NotFound,
    /// The source refused the lookup.
    ///
    /// The attached string contains the source's response.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The source did not answer within its own deadline.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    /// The source could not be reached or answered with a transient failure,
    /// like connection loss, DNS resolution, or a 5xx response.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// An invalid [`CacheConfig`](crate::CacheConfig) rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `capacity` was zero; the cache must be able to hold at least one entry.
    #[error("capacity must be at least 1")]
    ZeroCapacity,
    /// `ttl` was zero; entries would expire the moment they are admitted.
    #[error("ttl must be positive")]
    ZeroTtl,
}
