// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::builder::MetricValue;
use crate::config::ClientConfig;
use crate::io::MultiLineWriter;
use crate::name::{namespace_prefix, non_empty};
use crate::sinks::{SharedSink, Transport};
use crate::sync::{spawn_reporter, ReporterHandle, ReporterOptions, ReporterStats};
use crate::types::{Gauge, Metric, MetricResult};

/// Default time between re-publications of cached gauges.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// The parts of a client configuration that decide what a gauge looks
/// like on the wire and where it goes.
///
/// Clients whose configurations differ only in other fields share a single
/// gauge cache, and with it a single background reporter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GaugeCacheKey {
    pub host: String,
    pub port: u16,
    pub namespace: Option<String>,
    pub server_label: Option<String>,
    pub sub_server_name: Option<String>,
}

impl GaugeCacheKey {
    pub fn from_config(config: &ClientConfig) -> Self {
        GaugeCacheKey {
            host: config.host.clone(),
            port: config.port,
            namespace: config.effective_namespace(),
            server_label: non_empty(config.server_label.as_deref()),
            sub_server_name: non_empty(config.sub_server_name.as_deref()),
        }
    }
}

impl fmt::Display for GaugeCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}",
            self.host,
            self.port,
            self.namespace.as_deref().unwrap_or("-")
        )
    }
}

/// What to do with a gauge that's set to no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullGaugePolicy {
    /// Keep the entry in the cache but skip it when reporting.
    #[default]
    Retain,
    /// Remove the entry from the cache.
    Remove,
}

/// Settings shared by every gauge cache created by a `GaugeCacheRegistry`.
#[derive(Debug, Clone)]
pub struct GaugeCacheOptions {
    pub report_interval: Duration,
    pub warn_on_overrun: bool,
    pub batch_size: Option<usize>,
    pub null_policy: NullGaugePolicy,
    pub log_send_failures: bool,
}

impl Default for GaugeCacheOptions {
    fn default() -> Self {
        GaugeCacheOptions {
            report_interval: DEFAULT_REPORT_INTERVAL,
            warn_on_overrun: true,
            batch_size: None,
            null_policy: NullGaugePolicy::default(),
            log_send_failures: true,
        }
    }
}

/// Last known value of every gauge emitted by a client.
///
/// Gauges are stored by their formatted name, without the namespace. Each
/// call to `report` sends every stored value again so that the aggregator
/// never sees a gauge go stale between updates from the application.
///
/// Reports take a snapshot of the cache and send it without holding the
/// lock, so setting gauges is never blocked on network I/O.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use refrain::{GaugeCache, GaugeCacheKey, MetricValue, SpyMetricSink};
///
/// let (rx, sink) = SpyMetricSink::new();
/// let key = GaugeCacheKey {
///     host: "127.0.0.1".to_string(),
///     port: 8125,
///     namespace: Some("unicorn".to_string()),
///     server_label: None,
///     sub_server_name: None,
/// };
///
/// let cache = GaugeCache::new(key, Arc::new(sink));
/// cache.set("workers.gauge", Some(MetricValue::Unsigned(8)));
/// cache.report();
///
/// assert_eq!(b"unicorn.workers.gauge:8|g".to_vec(), rx.recv().unwrap());
/// ```
pub struct GaugeCache {
    key: GaugeCacheKey,
    prefix: String,
    transport: Transport,
    batch_size: Option<usize>,
    null_policy: NullGaugePolicy,
    values: Mutex<HashMap<String, Option<MetricValue>>>,
    reporter: Mutex<Option<ReporterHandle>>,
}

impl GaugeCache {
    /// Create a cache that reports through `sink` only when `report` is called.
    pub fn new(key: GaugeCacheKey, sink: SharedSink) -> Self {
        let opts = GaugeCacheOptions::default();
        Self::with_options(key, Transport::new(sink, opts.log_send_failures), &opts)
    }

    pub(crate) fn with_options(key: GaugeCacheKey, transport: Transport, opts: &GaugeCacheOptions) -> Self {
        GaugeCache {
            prefix: namespace_prefix(key.namespace.as_deref()),
            key,
            transport,
            batch_size: opts.batch_size,
            null_policy: opts.null_policy,
            values: Mutex::new(HashMap::new()),
            reporter: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &GaugeCacheKey {
        &self.key
    }

    /// Store the last value of a gauge, replacing any previous value.
    ///
    /// A value of `None` means the gauge should no longer be reported.
    pub fn set(&self, name: &str, value: Option<MetricValue>) {
        let mut values = self.values.lock();
        match (value, self.null_policy) {
            (None, NullGaugePolicy::Remove) => {
                values.remove(name);
            }
            (value, _) => {
                values.insert(name.to_string(), value);
            }
        }
    }

    /// Get the stored value of a gauge.
    ///
    /// The outer `Option` is `None` if the gauge isn't in the cache, the
    /// inner one is `None` if it's in the cache without a value.
    pub fn get(&self, name: &str) -> Option<Option<MetricValue>> {
        self.values.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.lock().contains_key(name)
    }

    /// Copy of every entry in the cache.
    pub fn snapshot(&self) -> HashMap<String, Option<MetricValue>> {
        self.values.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    /// Send every stored gauge that has a value, returning how many were sent.
    ///
    /// Gauges are written as a batch: as many as the batch size allows are
    /// joined into each datagram. They're sent in name order.
    pub fn report(&self) -> usize {
        let mut gauges: Vec<(String, MetricValue)> = {
            let values = self.values.lock();
            values
                .iter()
                .filter_map(|(name, value)| value.as_ref().map(|v| (name.clone(), v.clone())))
                .collect()
        };

        if gauges.is_empty() {
            return 0;
        }

        gauges.sort_by(|a, b| a.0.cmp(&b.0));
        debug!("reporting {} cached gauges for {}", gauges.len(), self.key);

        let mut writer = MultiLineWriter::new(self.transport.writer(), self.batch_size);
        for (name, value) in gauges.iter() {
            let gauge = Gauge::from_value(&self.prefix, name, value);
            let _ = writer.write(gauge.as_metric_str().as_bytes());
        }
        let _ = writer.flush();

        gauges.len()
    }

    /// Stop the background reporter for this cache, if there is one.
    ///
    /// The cache remains usable and may still be reported on demand.
    pub fn stop_reporting(&self) {
        let handle = self.reporter.lock().take();
        if let Some(mut handle) = handle {
            handle.stop();
        }
    }

    pub fn is_reporting(&self) -> bool {
        self.reporter.lock().as_ref().map(|h| h.is_running()).unwrap_or(false)
    }

    /// Statistics of the background reporter, if one was started.
    pub fn reporter_stats(&self) -> Option<Arc<ReporterStats>> {
        self.reporter.lock().as_ref().map(|h| h.stats())
    }

    fn attach_reporter(&self, handle: ReporterHandle) {
        *self.reporter.lock() = Some(handle);
    }
}

impl fmt::Debug for GaugeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaugeCache")
            .field("key", &self.key)
            .field("batch_size", &self.batch_size)
            .field("null_policy", &self.null_policy)
            .field("len", &self.len())
            .finish()
    }
}

/// Registry that keeps at most one gauge cache, and one background reporter,
/// per `GaugeCacheKey`.
#[derive(Debug, Default)]
pub struct GaugeCacheRegistry {
    caches: Mutex<HashMap<GaugeCacheKey, Arc<GaugeCache>>>,
    options: GaugeCacheOptions,
    reporters_started: AtomicU64,
}

impl GaugeCacheRegistry {
    pub fn new(options: GaugeCacheOptions) -> Self {
        GaugeCacheRegistry {
            caches: Mutex::new(HashMap::new()),
            options,
            reporters_started: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> &GaugeCacheOptions {
        &self.options
    }

    /// Get the cache for `key`, creating it and starting its reporter if it
    /// doesn't exist yet.
    ///
    /// Registering a key that's already registered returns the existing cache
    /// and does not start another reporter. The sink is only used when a new
    /// cache is created.
    pub fn register(&self, key: GaugeCacheKey, sink: SharedSink) -> MetricResult<Arc<GaugeCache>> {
        let mut caches = self.caches.lock();
        if let Some(cache) = caches.get(&key) {
            return Ok(Arc::clone(cache));
        }

        let transport = Transport::new(sink, self.options.log_send_failures);
        let cache = Arc::new(GaugeCache::with_options(key.clone(), transport, &self.options));
        let id = self.reporters_started.load(Ordering::Relaxed);
        let opts = ReporterOptions {
            name: format!("refrain-gauges-{}", id),
            period: self.options.report_interval,
            warn_on_overrun: self.options.warn_on_overrun,
        };

        // The reporter only holds a weak reference so that it ends once the
        // cache is no longer used by anything.
        let weak: Weak<GaugeCache> = Arc::downgrade(&cache);
        let handle = spawn_reporter(opts, move || match weak.upgrade() {
            Some(cache) => {
                cache.report();
                true
            }
            None => false,
        })?;

        cache.attach_reporter(handle);
        self.reporters_started.fetch_add(1, Ordering::Relaxed);
        caches.insert(key, Arc::clone(&cache));
        Ok(cache)
    }

    pub fn get(&self, key: &GaugeCacheKey) -> Option<Arc<GaugeCache>> {
        self.caches.lock().get(key).cloned()
    }

    pub fn caches(&self) -> Vec<Arc<GaugeCache>> {
        self.caches.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.caches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.lock().is_empty()
    }

    /// Total number of background reporters this registry has started.
    pub fn reporters_started(&self) -> u64 {
        self.reporters_started.load(Ordering::Relaxed)
    }

    /// Stop every reporter and forget every cache.
    ///
    /// Caches still referenced elsewhere remain usable but are no longer
    /// reported in the background. Registering one of their keys again
    /// creates a new cache.
    pub fn reset(&self) {
        let caches: Vec<Arc<GaugeCache>> = self.caches.lock().drain().map(|(_, c)| c).collect();
        for cache in caches {
            cache.stop_reporting();
        }
    }

    /// Stop every reporter while keeping the caches registered.
    pub fn shutdown(&self) {
        for cache in self.caches() {
            cache.stop_reporting();
        }
    }
}
