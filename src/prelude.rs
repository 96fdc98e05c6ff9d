// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Export commonly used parts of Refrain for easy glob imports
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use refrain::prelude::*;
//! use refrain::{ClientConfig, MetricsClient, NopMetricSink};
//!
//! let client = MetricsClient::from_sink(ClientConfig::default(), Arc::new(NopMetricSink));
//!
//! client.count("some.counter", 1).unwrap();
//! client.increment("some.counter").unwrap();
//! client.time("some.timer", 23).unwrap();
//! client.gauge("some.gauge", 45u64).unwrap();
//! client.set("some.set", 67).unwrap();
//! client.timer("some.timer").run(|| ()).unwrap();
//! client.clear_gauge("some.gauge").unwrap();
//! ```

pub use crate::client::{Counted, CountedExt, Gauged, GaugedExt, MetricClient, Setted, Timed, TimedExt};
