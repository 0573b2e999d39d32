//! Sends cache metrics to statsd.
//!
//! The crate reports through the [`metric!`] macro, which stays silent until
//! [`configure_statsd`] installs the global [`cadence`] client. Embedders
//! that do not care about metrics simply never call it.

use std::io;
use std::net::{ToSocketAddrs, UdpSocket};
use std::sync::OnceLock;
use std::time::Duration;

use cadence::prelude::*;
use cadence::{StatsdClient, UdpMetricSink};

static CLIENT: OnceLock<StatsdClient> = OnceLock::new();

/// Routes all [`metric!`] output to the statsd endpoint at `host`.
///
/// `prefix` is prepended to every metric name; `tags` are attached to every
/// datagram as client-level default tags. Fails if the socket cannot be set
/// up or if metrics were already configured for this process.
pub fn configure_statsd<A, T>(prefix: &str, host: A, tags: T) -> io::Result<()>
where
    A: ToSocketAddrs,
    T: IntoIterator<Item = (String, String)>,
{
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_nonblocking(true)?;
    let sink = UdpMetricSink::from(host, socket)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let mut builder = StatsdClient::builder(prefix, sink);
    for (tag, value) in tags {
        builder = builder.with_tag(tag, value);
    }

    CLIENT.set(builder.build()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "statsd metrics already configured",
        )
    })?;

    tracing::info!(prefix, "reporting metrics to statsd");
    Ok(())
}

#[doc(hidden)]
pub fn counter(key: &str, value: i64, tags: &[(&str, &str)]) {
    if let Some(client) = CLIENT.get() {
        let mut metric = client.count_with_tags(key, value);
        for (tag, tag_value) in tags {
            metric = metric.with_tag(tag, tag_value);
        }
        metric.send();
    }
}

#[doc(hidden)]
pub fn gauge(key: &str, value: u64, tags: &[(&str, &str)]) {
    if let Some(client) = CLIENT.get() {
        let mut metric = client.gauge_with_tags(key, value);
        for (tag, tag_value) in tags {
            metric = metric.with_tag(tag, tag_value);
        }
        metric.send();
    }
}

#[doc(hidden)]
pub fn timer(key: &str, value: Duration, tags: &[(&str, &str)]) {
    if let Some(client) = CLIENT.get() {
        let mut metric = client.time_with_tags(key, value);
        for (tag, tag_value) in tags {
            metric = metric.with_tag(tag, tag_value);
        }
        metric.send();
    }
}

/// Emits a metric.
///
/// ```ignore
/// metric!(counter("cache.hit") += 1);
/// metric!(gauge("cache.entries") = entries);
/// metric!(timer("fetch.duration") = start.elapsed(), "result" => "success");
/// ```
#[macro_export]
macro_rules! metric {
    (counter($id:expr) += $value:expr $(, $k:expr => $v:expr)* $(,)?) => {
        $crate::metrics::counter($id, $value, &[$(($k, $v)),*])
    };
    (gauge($id:expr) = $value:expr $(, $k:expr => $v:expr)* $(,)?) => {
        $crate::metrics::gauge($id, $value, &[$(($k, $v)),*])
    };
    (timer($id:expr) = $value:expr $(, $k:expr => $v:expr)* $(,)?) => {
        $crate::metrics::timer($id, $value, &[$(($k, $v)),*])
    };
}
