// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A Statsd client that keeps your gauges fresh!
//!
//! Refrain emits counters, timers, gauges, and sets to Statsd over UDP. Every
//! gauge a client records is also remembered, and sent again on a fixed
//! period, so that aggregators which expire idle gauges always have a
//! current value even when the application only updates it rarely.
//!
//! ## Features
//!
//! * Counters, timers, gauges, and sets sent to Statsd over UDP.
//! * A gauge cache per destination with a background reporter that
//!   re-publishes the last value of every gauge.
//! * Batches that join metrics into as few datagrams as possible and flush
//!   on every exit path, panics included.
//! * A registry that creates each client once per configuration.
//! * Timestamped metrics and distribution summaries written to a plaintext
//!   TCP line receiver.
//!
//! ## Naming
//!
//! Metric names are built from the namespace of the client, the name given
//! when recording the metric, the kind of the metric, and the server and
//! sub-server labels of the client, joined with `.`:
//!
//! ``` text
//! unicorn.test_runs.counter.prod-fe1:1|c
//! unicorn.memory.gauge.prod-fe1:128000|g
//! unicorn.render.timer.prod-fe1:320|ms
//! unicorn.visitors.prod-fe1:user-42|s
//! ```
//!
//! ## Usage
//!
//! Applications create a single `MetricsRegistry` and get clients from it.
//! Clients are cheap to share and the registry hands out the same client for
//! the same configuration.
//!
//! ```rust,no_run
//! use refrain::prelude::*;
//! use refrain::{MetricsConfig, MetricsRegistry};
//!
//! let config = MetricsConfig::builder()
//!     .service_name("unicorn")
//!     .server_name("prod-fe1")
//!     .statsd_host("metrics.example.com")
//!     .build()
//!     .unwrap();
//!
//! let registry = MetricsRegistry::new();
//! let client = registry.client_for(&config, None, None).unwrap();
//!
//! client.increment("test_runs").unwrap();
//! client.gauge("memory", 128000u64).unwrap();
//! let _rows = client.timer("render").run(|| 42).unwrap();
//! client.set("visitors", "user-42").unwrap();
//! ```
//!
//! ### Batches
//!
//! ```rust,no_run
//! use refrain::prelude::*;
//! use refrain::{ClientConfig, MetricsRegistry};
//!
//! let registry = MetricsRegistry::builder().batch_size(2).build();
//! let client = registry.get_or_create(&ClientConfig::default().with_namespace("unicorn")).unwrap();
//!
//! client.batch(|batch| {
//!     batch.counter("test_runs", 1).unwrap();
//!     batch.gauge("current_size", 9u64).unwrap();
//!     batch.gauge("memory", 128000u64).unwrap();
//! });
//! ```
//!
//! ### Components
//!
//! Components that record metrics take a `MetricsFactory` in their
//! constructor instead of creating clients themselves. See the docs of
//! `MetricsFactory` for an example.
//!
//! ## Errors
//!
//! Recording a metric only fails for invalid arguments, such as an empty
//! name. Failures to send metrics are logged with the `log` crate and never
//! returned to the caller.

#![forbid(unsafe_code)]

pub const DEFAULT_PORT: u16 = 8125;

pub const DEFAULT_HOST: &str = "127.0.0.1";

pub use self::batch::Batch;

pub use self::builder::MetricValue;

pub use self::client::{
    Counted, CountedExt, Gauged, GaugedExt, MetricClient, MetricsClient, Setted, Timed, TimedExt, TimerBuilder,
};

pub use self::config::{ClientConfig, ConfigProfile, MetricsConfig, MetricsConfigBuilder, CONFIG_FIELDS};

pub use self::direct::{generate_distribution, rounded_tick, DirectMetric, DirectReporter, DistributionSummary};

pub use self::gauges::{
    GaugeCache, GaugeCacheKey, GaugeCacheOptions, GaugeCacheRegistry, NullGaugePolicy, DEFAULT_REPORT_INTERVAL,
};

pub use self::name::{default_namespace, namespace_prefix, MetricNamer, StatKind};

pub use self::registry::{MetricsFactory, MetricsRegistry, MetricsRegistryBuilder, SinkFactory};

pub use self::sinks::{
    BufferedSpyMetricSink, MetricSink, NopMetricSink, SharedSink, SinkStats, SocketStats, SpyMetricSink,
    UdpMetricSink,
};

pub use self::sync::ReporterStats;

pub use self::types::{Counter, ErrorKind, Gauge, Metric, MetricError, MetricResult, Set, Timer};

mod batch;
mod builder;
mod client;
mod config;
pub mod direct;
pub mod ext;
mod gauges;
mod io;
mod name;
pub mod prelude;
mod registry;
mod sinks;
mod sync;
mod types;


mod sealed {
    pub trait Sealed {}
}
