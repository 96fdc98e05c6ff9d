// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use log::{debug, error};
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub bytes_sent: u64,
    pub packets_sent: u64,
    pub bytes_dropped: u64,
    pub packets_dropped: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SocketStats {
    bytes_sent: Arc<AtomicU64>,
    packets_sent: Arc<AtomicU64>,
    bytes_dropped: Arc<AtomicU64>,
    packets_dropped: Arc<AtomicU64>,
}

impl SocketStats {
    pub fn incr_bytes_sent(&self, n: u64) {
        self.bytes_sent.fetch_add(n, Ordering::Relaxed);
    }

    pub fn incr_packets_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_bytes_dropped(&self, n: u64) {
        self.bytes_dropped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn incr_packets_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update(&self, res: io::Result<usize>, len: usize) -> io::Result<usize> {
        match res {
            Ok(written) => {
                self.incr_bytes_sent(written as u64);
                self.incr_packets_sent();
                Ok(written)
            }
            Err(e) => {
                self.incr_bytes_dropped(len as u64);
                self.incr_packets_dropped();
                Err(e)
            }
        }
    }
}

impl From<&SocketStats> for SinkStats {
    fn from(stats: &SocketStats) -> Self {
        SinkStats {
            bytes_sent: stats.bytes_sent.load(Ordering::Relaxed),
            packets_sent: stats.packets_sent.load(Ordering::Relaxed),
            bytes_dropped: stats.bytes_dropped.load(Ordering::Relaxed),
            packets_dropped: stats.packets_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Trait for various backends that send Statsd metrics somewhere.
///
/// Each call to `emit` is one datagram. The payload is either a single
/// metric in the canonical Statsd format or several of them separated by
/// newlines when they were batched together. Payloads never include a
/// trailing newline. Examples of each supported metric type are given below.
///
/// ## Counter
///
/// ``` text
/// unicorn.test_runs.counter.prod-fe1:1|c
/// ```
///
/// ## Timer
///
/// ``` text
/// unicorn.render.timer.prod-fe1:320|ms
/// ```
///
/// ## Gauge
///
/// ``` text
/// unicorn.memory.gauge.prod-fe1:128000|g
/// ```
///
/// ## Set
///
/// ``` text
/// unicorn.visitors.prod-fe1:user-42|s
/// ```
///
/// See the [Statsd spec](https://github.com/b/statsd_spec) for more
/// information.
pub trait MetricSink {
    /// Send the payload using this sink and return the number of bytes
    /// written or an I/O error.
    ///
    /// Note that implementations may return `0` bytes if the metric is not
    /// immediately written (such as when it is buffered).  Callers should *NOT*
    /// interpret this as an error.
    fn emit(&self, metric: &str) -> io::Result<usize>;

    /// Flush any currently buffered metrics to the underlying backend, returning
    /// an I/O error if they could not be written for some reason.
    ///
    /// Note that not all sinks buffer metrics and so the default implementation of
    /// this method does nothing.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Return I/O telemetry like bytes / packets sent or dropped.
    ///
    /// Note that not all sinks implement this method and the default implementation
    /// returns zeros.
    fn stats(&self) -> SinkStats {
        SinkStats::default()
    }
}

/// A sink that may be shared between clients, gauge caches, and threads.
pub type SharedSink = Arc<dyn MetricSink + Send + Sync>;

/// Implementation of a `MetricSink` that discards all metrics.
///
/// Useful for disabling metric collection or unit tests.
#[derive(Debug, Clone)]
pub struct NopMetricSink;

impl MetricSink for NopMetricSink {
    fn emit(&self, _metric: &str) -> io::Result<usize> {
        Ok(0)
    }
}

/// Best-effort sending of payloads through a sink.
///
/// Sends are fire and forget: an error from the sink is logged (unless
/// disabled) and dropped, it never reaches the code recording the metric.
#[derive(Clone)]
pub(crate) struct Transport {
    sink: SharedSink,
    log_send_failures: bool,
}

impl Transport {
    pub(crate) fn new(sink: SharedSink, log_send_failures: bool) -> Self {
        Transport {
            sink,
            log_send_failures,
        }
    }

    pub(crate) fn send(&self, payload: &str) -> usize {
        debug!("statsd: {}", payload);
        match self.sink.emit(payload) {
            Ok(n) => n,
            Err(e) => {
                if self.log_send_failures {
                    error!("statsd exception sending: {:?}: {}", e.kind(), e);
                }
                0
            }
        }
    }

    pub(crate) fn writer(&self) -> TransportWriter {
        TransportWriter {
            transport: self.clone(),
        }
    }

    pub(crate) fn sink(&self) -> &SharedSink {
        &self.sink
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("stats", &self.sink.stats())
            .field("log_send_failures", &self.log_send_failures)
            .finish()
    }
}

/// Adapter for writing payloads to a `Transport` via the `Write` trait
#[derive(Debug)]
pub(crate) struct TransportWriter {
    transport: Transport,
}

impl Write for TransportWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.transport.send(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Err(e) = self.transport.sink.flush() {
            if self.transport.log_send_failures {
                error!("statsd exception flushing: {:?}: {}", e.kind(), e);
            }
        }
        Ok(())
    }
}
