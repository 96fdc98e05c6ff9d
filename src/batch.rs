// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use parking_lot::Mutex;
use std::fmt;
use std::io::Write;

use crate::client::{MetricBackend, MetricsClient};
use crate::gauges::GaugeCache;
use crate::io::MultiLineWriter;
use crate::name::StatKind;
use crate::sealed::Sealed;
use crate::sinks::TransportWriter;
use crate::types::{Metric, MetricResult};

/// Scope that buffers metrics and sends them as newline separated payloads.
///
/// A batch is created by `MetricsClient::batch` and supports every metric
/// trait the client does, with the same naming and gauge caching. Metrics
/// recorded on a batch are held in memory until the batch size is reached,
/// `flush` is called, or the batch goes out of scope. Leaving the scope
/// sends anything still buffered, whether the closure returned normally,
/// returned early, or panicked.
///
/// With no batch size every metric recorded in the scope is sent as a
/// single payload.
pub struct Batch<'c> {
    client: &'c MetricsClient,
    // Sends anything still buffered when dropped, including during unwinding
    writer: Mutex<MultiLineWriter<TransportWriter>>,
}

impl<'c> Batch<'c> {
    pub(crate) fn new(client: &'c MetricsClient, writer: TransportWriter, batch_size: Option<usize>) -> Self {
        Batch {
            client,
            writer: Mutex::new(MultiLineWriter::new(writer, batch_size)),
        }
    }

    /// Maximum number of metrics per payload, if there is one.
    pub fn batch_size(&self) -> Option<usize> {
        self.writer.lock().capacity()
    }

    /// Change the maximum number of metrics per payload.
    ///
    /// If the batch already holds at least that many metrics they are sent
    /// immediately.
    pub fn set_batch_size(&self, batch_size: Option<usize>) -> MetricResult<()> {
        Ok(self.writer.lock().set_capacity(batch_size)?)
    }

    /// Send every buffered metric now.
    pub fn flush(&self) -> MetricResult<()> {
        Ok(self.writer.lock().flush()?)
    }

    /// Number of metrics buffered and not yet sent.
    pub fn buffered(&self) -> usize {
        self.writer.lock().buffered()
    }

    pub fn client(&self) -> &MetricsClient {
        self.client
    }
}

impl<'c> Sealed for Batch<'c> {}

impl<'c> MetricBackend for Batch<'c> {
    fn metric_name(&self, key: &str, kind: StatKind) -> MetricResult<String> {
        self.client.metric_name(key, kind)
    }

    fn prefix(&self) -> &str {
        self.client.prefix()
    }

    fn gauges(&self) -> &GaugeCache {
        self.client.gauges()
    }

    fn send_metric<M>(&self, metric: &M) -> MetricResult<()>
    where
        M: Metric,
    {
        let _ = self.writer.lock().write(metric.as_metric_str().as_bytes())?;
        Ok(())
    }
}

impl<'c> fmt::Debug for Batch<'c> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("client", &self.client)
            .field("batch_size", &self.batch_size())
            .field("buffered", &self.buffered())
            .finish()
    }
}
