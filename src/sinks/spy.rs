// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::io::MultiLineWriter;
use crate::sinks::core::MetricSink;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::io::{self, ErrorKind, Write};

// Lines per payload for `BufferedSpyMetricSink::new`
const DEFAULT_BUFFER_LINES: usize = 16;

/// Sink that captures every datagram in a channel instead of the network.
///
/// Clients built on this sink hand each payload they would have sent over
/// UDP to the returned `Receiver`, one item per datagram, so tests can
/// assert on exactly what reaches Statsd. Capturing registries and clients
/// in `refrain::test` are built on it.
///
/// The channel is unbounded unless created with `with_capacity`. A full or
/// disconnected channel makes `emit` fail the way a failed send would.
#[derive(Debug)]
pub struct SpyMetricSink {
    sender: Sender<Vec<u8>>,
}

impl SpyMetricSink {
    pub fn new() -> (Receiver<Vec<u8>>, Self) {
        let (tx, rx) = channel(None);
        (rx, SpyMetricSink { sender: tx })
    }

    /// Sink whose channel holds at most `queue` datagrams.
    pub fn with_capacity(queue: usize) -> (Receiver<Vec<u8>>, Self) {
        let (tx, rx) = channel(Some(queue));
        (rx, SpyMetricSink { sender: tx })
    }
}

impl MetricSink for SpyMetricSink {
    fn emit(&self, metric: &str) -> io::Result<usize> {
        capture(&self.sender, metric.as_bytes())
    }
}

/// Capturing sink that joins lines itself before handing them over.
///
/// Each call to `emit` adds one line. Once `lines` lines are held they are
/// joined with `\n` into a single captured payload, the same way a batch
/// joins metrics into a datagram. Anything held is captured on `flush` and
/// when the sink is dropped.
#[derive(Debug)]
pub struct BufferedSpyMetricSink {
    writer: Mutex<MultiLineWriter<ChannelWriter>>,
}

impl BufferedSpyMetricSink {
    pub fn new() -> (Receiver<Vec<u8>>, Self) {
        Self::with_capacity(None, Some(DEFAULT_BUFFER_LINES))
    }

    /// Sink with at most `queue` payloads in its channel and `lines` lines
    /// per payload.
    pub fn with_capacity(queue: Option<usize>, lines: Option<usize>) -> (Receiver<Vec<u8>>, Self) {
        let (tx, rx) = channel(queue);
        let writer = MultiLineWriter::new(ChannelWriter { sender: tx }, lines);
        (
            rx,
            BufferedSpyMetricSink {
                writer: Mutex::new(writer),
            },
        )
    }
}

impl MetricSink for BufferedSpyMetricSink {
    fn emit(&self, metric: &str) -> io::Result<usize> {
        self.writer.lock().write(metric.as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        self.writer.lock().flush()
    }
}

#[derive(Debug)]
struct ChannelWriter {
    sender: Sender<Vec<u8>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        capture(&self.sender, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn channel(queue: Option<usize>) -> (Sender<Vec<u8>>, Receiver<Vec<u8>>) {
    match queue {
        Some(n) => bounded(n),
        None => unbounded(),
    }
}

fn capture(sender: &Sender<Vec<u8>>, payload: &[u8]) -> io::Result<usize> {
    match sender.try_send(payload.to_vec()) {
        Ok(()) => Ok(payload.len()),
        Err(TrySendError::Full(_)) => Err(io::Error::new(ErrorKind::WouldBlock, "capture channel full")),
        Err(TrySendError::Disconnected(_)) => Err(io::Error::new(ErrorKind::BrokenPipe, "capture channel closed")),
    }
}

#[cfg(test)]
mod tests {
    use super::{BufferedSpyMetricSink, MetricSink, SpyMetricSink};
    use crate::client::MetricsClient;
    use crate::config::ClientConfig;
    use crate::prelude::*;
    use std::io::ErrorKind;
    use std::sync::Arc;

    #[test]
    fn test_spy_captures_client_datagrams() {
        let (rx, sink) = SpyMetricSink::new();
        let client = MetricsClient::from_sink(ClientConfig::default().with_namespace("unicorn"), Arc::new(sink));

        client.increment("test_runs").unwrap();
        client.set("visitors", "user-42").unwrap();

        let sent: Vec<Vec<u8>> = rx.try_iter().collect();
        assert_eq!(
            vec![b"unicorn.test_runs.counter:1|c".to_vec(), b"unicorn.visitors:user-42|s".to_vec()],
            sent
        );
    }

    #[test]
    fn test_spy_full_channel() {
        let (_rx, sink) = SpyMetricSink::with_capacity(1);
        assert_eq!(9, sink.emit("queue:3|g").unwrap());

        let err = sink.emit("queue:4|g").unwrap_err();
        assert_eq!(ErrorKind::WouldBlock, err.kind());
    }

    #[test]
    fn test_spy_full_channel_never_fails_client() {
        let (rx, sink) = SpyMetricSink::with_capacity(1);
        let client = MetricsClient::from_sink(ClientConfig::default(), Arc::new(sink));

        client.gauge("queue", 3u64).unwrap();
        client.gauge("queue", 4u64).unwrap();

        assert_eq!(vec![b"queue.gauge:3|g".to_vec()], rx.try_iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_spy_closed_channel() {
        let (rx, sink) = SpyMetricSink::new();
        drop(rx);

        let err = sink.emit("queue:3|g").unwrap_err();
        assert_eq!(ErrorKind::BrokenPipe, err.kind());
    }

    #[test]
    fn test_buffered_spy_joins_lines() {
        let (rx, sink) = BufferedSpyMetricSink::with_capacity(None, Some(2));
        sink.emit("memory:128000|g").unwrap();
        assert!(rx.try_recv().is_err());

        sink.emit("workers:4|g").unwrap();
        assert_eq!(b"memory:128000|g\nworkers:4|g".to_vec(), rx.try_recv().unwrap());
    }

    #[test]
    fn test_buffered_spy_flush_and_drop() {
        let (rx, sink) = BufferedSpyMetricSink::with_capacity(None, Some(8));
        sink.emit("memory:128000|g").unwrap();
        sink.flush().unwrap();
        assert_eq!(b"memory:128000|g".to_vec(), rx.try_recv().unwrap());

        sink.emit("workers:4|g").unwrap();
        drop(sink);
        assert_eq!(b"workers:4|g".to_vec(), rx.try_recv().unwrap());
    }
}
