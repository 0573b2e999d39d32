//! Logging initialization for applications embedding the cache.
//!
//! The crate itself only emits [`tracing`] events and spans; this helper
//! installs a JSON subscriber for binaries that do not bring their own.

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::{fmt, MakeWriter};

/// Initializes JSON logging with the given env filter, writing to `make_writer`.
///
/// Panics if a global subscriber is already installed.
pub fn init_json_logging<W>(env_filter: &str, make_writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    fmt()
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_env_filter(env_filter)
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(make_writer)
        .init();
}
