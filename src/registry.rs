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
use std::sync::Arc;
use std::time::Duration;

use crate::client::MetricsClient;
use crate::config::{ClientConfig, MetricsConfig};
use crate::gauges::{GaugeCache, GaugeCacheKey, GaugeCacheOptions, GaugeCacheRegistry, NullGaugePolicy};
use crate::sinks::{SharedSink, Transport, UdpMetricSink};
use crate::types::MetricResult;

/// Function used by a registry to create the sink for a new client.
pub type SinkFactory = Arc<dyn Fn(&ClientConfig) -> MetricResult<SharedSink> + Send + Sync>;

fn udp_sink_factory() -> SinkFactory {
    Arc::new(|config: &ClientConfig| {
        let sink: SharedSink = Arc::new(UdpMetricSink::new(&config.host, config.port));
        Ok(sink)
    })
}

/// Builder for creating and customizing `MetricsRegistry` instances.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use refrain::{MetricsRegistry, NopMetricSink, SharedSink};
///
/// let registry = MetricsRegistry::builder()
///     .report_interval(Duration::from_secs(30))
///     .warn_on_overrun(false)
///     .batch_size(16)
///     .sink_factory(|_config| {
///         let sink: SharedSink = Arc::new(NopMetricSink);
///         Ok(sink)
///     })
///     .build();
///
/// assert_eq!(Duration::from_secs(30), registry.gauge_caches().options().report_interval);
/// ```
pub struct MetricsRegistryBuilder {
    options: GaugeCacheOptions,
    sink_factory: SinkFactory,
}

impl MetricsRegistryBuilder {
    /// How often cached gauges are re-published. Defaults to 60 seconds.
    ///
    /// Reports run on multiples of the interval in wall-clock time, so with
    /// the default every cache reports at the start of each minute.
    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.options.report_interval = interval;
        self
    }

    /// Log a warning when a report cycle starts late. Enabled by default,
    /// typically disabled in tests.
    pub fn warn_on_overrun(mut self, warn: bool) -> Self {
        self.options.warn_on_overrun = warn;
        self
    }

    /// Log metrics that could not be sent. Enabled by default.
    pub fn log_send_failures(mut self, log: bool) -> Self {
        self.options.log_send_failures = log;
        self
    }

    /// Maximum number of metrics joined into a single datagram by batches
    /// and gauge reports. Unbounded by default.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.options.batch_size = Some(size);
        self
    }

    pub fn null_policy(mut self, policy: NullGaugePolicy) -> Self {
        self.options.null_policy = policy;
        self
    }

    /// Use `factory` to create the sink for each new client instead of a
    /// `UdpMetricSink` for the configured host and port.
    pub fn sink_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ClientConfig) -> MetricResult<SharedSink> + Send + Sync + 'static,
    {
        self.sink_factory = Arc::new(factory);
        self
    }

    pub fn build(self) -> MetricsRegistry {
        MetricsRegistry {
            clients: Mutex::new(HashMap::new()),
            gauges: GaugeCacheRegistry::new(self.options),
            sink_factory: self.sink_factory,
        }
    }
}

impl Default for MetricsRegistryBuilder {
    fn default() -> Self {
        MetricsRegistryBuilder {
            options: GaugeCacheOptions::default(),
            sink_factory: udp_sink_factory(),
        }
    }
}

/// Cache of clients keyed by their configuration.
///
/// Creating a client opens sockets and registers a gauge cache with a
/// background reporter, so clients are meant to be created once and shared.
/// A registry returns the same `Arc<MetricsClient>` for every equal
/// `ClientConfig`, even when called concurrently from many threads.
///
/// Clients whose configurations only differ in fields that don't affect the
/// wire format (such as a cluster and service name that resolve to the same
/// namespace as an explicit one) share a single gauge cache.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use refrain::prelude::*;
/// use refrain::{ClientConfig, MetricsRegistry};
///
/// let registry = MetricsRegistry::new();
/// let config = ClientConfig::default().with_namespace("unicorn");
///
/// let client = registry.get_or_create(&config).unwrap();
/// let same = registry.get_or_create(&config).unwrap();
/// assert!(Arc::ptr_eq(&client, &same));
///
/// client.gauge("workers", 8u64).unwrap();
/// ```
pub struct MetricsRegistry {
    clients: Mutex<HashMap<ClientConfig, Arc<MetricsClient>>>,
    gauges: GaugeCacheRegistry,
    sink_factory: SinkFactory,
}

impl MetricsRegistry {
    /// Create a registry with the default options that sends over UDP.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MetricsRegistryBuilder {
        MetricsRegistryBuilder::default()
    }

    /// Get the client for `config`, creating it if needed.
    ///
    /// Only one client is ever created for equal configurations. Creating a
    /// client also registers its gauge cache, which starts a background
    /// reporter the first time a cache key is seen.
    pub fn get_or_create(&self, config: &ClientConfig) -> MetricResult<Arc<MetricsClient>> {
        // Lock order is clients then gauge caches, never the reverse
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(config) {
            return Ok(Arc::clone(client));
        }

        let sink = (self.sink_factory)(config)?;
        let key = GaugeCacheKey::from_config(config);
        let gauges = self.gauges.register(key, Arc::clone(&sink))?;
        let options = self.gauges.options();
        let transport = Transport::new(sink, options.log_send_failures);

        let client = Arc::new(MetricsClient::new(
            config.clone(),
            transport,
            gauges,
            options.batch_size,
        ));

        debug!("created metrics client for {}:{}", config.host, config.port);
        clients.insert(config.clone(), Arc::clone(&client));
        Ok(client)
    }

    /// Resolve `profile` and `namespace` against `config` and get the
    /// client for the result.
    pub fn client_for(
        &self,
        config: &MetricsConfig,
        profile: Option<&str>,
        namespace: Option<&str>,
    ) -> MetricResult<Arc<MetricsClient>> {
        let resolved = config.client_config(profile, namespace)?;
        self.get_or_create(&resolved)
    }

    /// Forget every client and gauge cache, stopping every reporter.
    ///
    /// Clients already handed out keep working, including their gauge caches,
    /// but their gauges are no longer re-published in the background. Later
    /// lookups create new clients.
    pub fn reset_all(&self) {
        self.clients.lock().clear();
        self.gauges.reset();
    }

    /// Stop every background reporter while keeping existing clients.
    pub fn shutdown(&self) {
        self.gauges.shutdown();
    }

    pub fn gauge_caches(&self) -> &GaugeCacheRegistry {
        &self.gauges
    }

    /// Gauge cache used by clients with `config`, if one was created.
    pub fn gauge_cache(&self, config: &ClientConfig) -> Option<Arc<GaugeCache>> {
        self.gauges.get(&GaugeCacheKey::from_config(config))
    }

    /// Number of clients in the registry.
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("clients", &self.len())
            .field("gauges", &self.gauges)
            .finish()
    }
}

/// Source of metrics clients handed to components that record metrics.
///
/// A factory pairs a registry with a configuration and, optionally, a
/// namespace for the component. Components take a factory in their
/// constructor rather than reaching for a global client.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use refrain::prelude::*;
/// use refrain::{MetricsConfig, MetricsFactory, MetricsRegistry};
///
/// struct Worker {
///     metrics: MetricsFactory,
/// }
///
/// impl Worker {
///     fn run(&self) {
///         let client = self.metrics.metrics().unwrap();
///         client.increment("jobs").unwrap();
///     }
/// }
///
/// let config = MetricsConfig::builder().service_name("billing").build().unwrap();
/// let factory = MetricsFactory::new(Arc::new(MetricsRegistry::new()), Arc::new(config));
/// let worker = Worker { metrics: factory.with_namespace("billing.worker") };
/// worker.run();
/// ```
#[derive(Clone)]
pub struct MetricsFactory {
    registry: Arc<MetricsRegistry>,
    config: Arc<MetricsConfig>,
    namespace: Option<String>,
}

impl MetricsFactory {
    pub fn new(registry: Arc<MetricsRegistry>, config: Arc<MetricsConfig>) -> Self {
        MetricsFactory {
            registry,
            config,
            namespace: None,
        }
    }

    /// Copy of this factory whose clients use `namespace`.
    pub fn with_namespace(&self, namespace: &str) -> Self {
        MetricsFactory {
            registry: Arc::clone(&self.registry),
            config: Arc::clone(&self.config),
            namespace: Some(namespace.to_string()),
        }
    }

    /// Client for the default profile and this factory's namespace.
    pub fn metrics(&self) -> MetricResult<Arc<MetricsClient>> {
        self.metrics_for(None, self.namespace.as_deref())
    }

    /// Client for a named profile, with an explicit namespace.
    pub fn metrics_for(&self, profile: Option<&str>, namespace: Option<&str>) -> MetricResult<Arc<MetricsClient>> {
        self.registry.client_for(&self.config, profile, namespace)
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &Arc<MetricsConfig> {
        &self.config
    }
}

impl fmt::Debug for MetricsFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsFactory")
            .field("config", &self.config)
            .field("namespace", &self.namespace)
            .finish()
    }
}
