// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::sinks::core::{MetricSink, SinkStats, SocketStats};
use crate::types::{ErrorKind, MetricError, MetricResult};

/// Attempt to convert anything implementing the `ToSocketAddrs` trait
/// into a concrete `SocketAddr` instance, returning an `IoError`
/// error if the address could not be parsed.
fn get_addr<A: ToSocketAddrs>(addr: A) -> MetricResult<SocketAddr> {
    match addr.to_socket_addrs()?.next() {
        Some(addr) => Ok(addr),
        None => Err(MetricError::from((ErrorKind::IoError, "No socket addresses yielded"))),
    }
}

fn unspecified_for(addr: &SocketAddr) -> &'static str {
    match addr {
        SocketAddr::V4(_) => "0.0.0.0:0",
        SocketAddr::V6(_) => "[::]:0",
    }
}

thread_local! {
    // Dropped when the thread exits, which marks its sockets as closable
    static THREAD_ALIVE: Arc<()> = Arc::new(());
}

/// Socket owned by a single thread, valid while that thread is running.
#[derive(Debug)]
struct ThreadSocket {
    alive: Weak<()>,
    socket: Arc<UdpSocket>,
}

impl ThreadSocket {
    fn is_live(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// Implementation of a `MetricSink` that emits metrics over UDP using one
/// connected socket per calling thread.
///
/// Sockets are created lazily, the first time a thread emits a metric through
/// this sink, and reused by that thread until it exits. Two threads never
/// write through the same socket. Lightweight tasks that are multiplexed on a
/// single OS thread share that thread's socket. Sockets of threads that have
/// exited are closed the next time any thread opens a socket, so threads that
/// come and go don't pile up open sockets.
///
/// The host name of the Statsd server is resolved when each socket is
/// connected rather than when the sink is created, so constructing the sink
/// never fails and never touches the network.
///
/// Each metric is sent to the Statsd server when the `.emit()` method is
/// called, in the thread of the caller.
#[derive(Debug)]
pub struct UdpMetricSink {
    host: String,
    port: u16,
    sockets: Mutex<HashMap<ThreadId, ThreadSocket>>,
    stats: SocketStats,
}

impl UdpMetricSink {
    /// Construct a new `UdpMetricSink` that sends to the given host and port.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use refrain::{MetricSink, UdpMetricSink, DEFAULT_PORT};
    ///
    /// let sink = UdpMetricSink::new("metrics.example.com", DEFAULT_PORT);
    /// sink.emit("unicorn.test_runs.counter:1|c").unwrap();
    /// ```
    pub fn new(host: &str, port: u16) -> UdpMetricSink {
        UdpMetricSink {
            host: host.to_string(),
            port,
            sockets: Mutex::new(HashMap::new()),
            stats: SocketStats::default(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Local address of the socket used by the calling thread, creating and
    /// connecting the socket if this thread hasn't used the sink yet.
    pub fn local_addr(&self) -> MetricResult<SocketAddr> {
        Ok(self.socket()?.local_addr()?)
    }

    /// Number of open sockets belonging to threads that are still running.
    pub fn sockets_open(&self) -> usize {
        let mut sockets = self.sockets.lock();
        sockets.retain(|_, s| s.is_live());
        sockets.len()
    }

    fn connect(&self) -> MetricResult<UdpSocket> {
        let addr = get_addr((self.host.as_str(), self.port))?;
        let socket = UdpSocket::bind(unspecified_for(&addr))?;
        socket.connect(addr)?;
        Ok(socket)
    }

    fn socket(&self) -> MetricResult<Arc<UdpSocket>> {
        let id = thread::current().id();
        if let Some(s) = self.sockets.lock().get(&id) {
            return Ok(Arc::clone(&s.socket));
        }

        // Resolve and connect without holding the pool lock
        let socket = Arc::new(self.connect()?);
        let alive = match THREAD_ALIVE.try_with(|alive| Arc::downgrade(alive)) {
            Ok(alive) => alive,
            // Thread is shutting down, use the socket once without pooling it
            Err(_) => return Ok(socket),
        };

        let mut sockets = self.sockets.lock();
        sockets.retain(|_, s| s.is_live());
        sockets.insert(
            id,
            ThreadSocket {
                alive,
                socket: Arc::clone(&socket),
            },
        );
        Ok(socket)
    }
}

impl MetricSink for UdpMetricSink {
    fn emit(&self, metric: &str) -> io::Result<usize> {
        let socket = match self.socket() {
            Ok(s) => s,
            Err(e) => {
                let err = io::Error::new(io::ErrorKind::NotConnected, e.to_string());
                return self.stats.update(Err(err), metric.len());
            }
        };

        // The pool lock is released before sending, only this thread
        // writes to its own socket.
        self.stats.update(socket.send(metric.as_bytes()), metric.len())
    }

    fn stats(&self) -> SinkStats {
        (&self.stats).into()
    }
}
