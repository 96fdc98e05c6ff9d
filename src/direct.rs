// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Metrics written directly to a plaintext TCP line receiver.
//!
//! Each metric is a line of `<name> <value> <tick>` where the tick is a
//! Unix timestamp in seconds, truncated to the start of its minute by
//! default. This bypasses Statsd aggregation entirely, which makes it
//! suitable for pre-computed distribution summaries.

use log::debug;
use std::cmp::Ordering;
use std::env;
use std::fmt;
use std::io::Write;
use std::net::TcpStream;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::builder::MetricValue;
use crate::types::{MetricError, MetricResult};

/// Host used when `DIRECT_METRIC_HOST` isn't set.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port used when `DIRECT_METRIC_PORT` isn't set.
pub const DEFAULT_PORT: u16 = 2003;

/// Ticks are truncated to a multiple of this many seconds.
pub const PERIOD: u64 = 60;

pub const HOST_ENV: &str = "DIRECT_METRIC_HOST";

pub const PORT_ENV: &str = "DIRECT_METRIC_PORT";

/// Current time in seconds since the epoch, truncated to the minute.
pub fn rounded_tick() -> u64 {
    rounded_tick_at(SystemTime::now())
}

/// `time` in seconds since the epoch, truncated to the minute.
pub fn rounded_tick_at(time: SystemTime) -> u64 {
    let secs = time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    secs - secs % PERIOD
}

/// A single timestamped metric.
///
/// # Example
///
/// ```
/// use refrain::DirectMetric;
///
/// let metric = DirectMetric::with_tick("unicorn.latency.count", 3u64, 1398063600);
/// assert_eq!("unicorn.latency.count 3 1398063600", metric.to_string());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DirectMetric {
    name: String,
    value: MetricValue,
    tick: u64,
}

impl DirectMetric {
    /// Create a metric stamped with the current minute.
    pub fn new<V>(name: &str, value: V) -> Self
    where
        V: Into<MetricValue>,
    {
        Self::with_tick(name, value, rounded_tick())
    }

    pub fn with_tick<V>(name: &str, value: V, tick: u64) -> Self
    where
        V: Into<MetricValue>,
    {
        DirectMetric {
            name: name.to_string(),
            value: value.into(),
            tick,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }
}

impl fmt::Display for DirectMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.value, self.tick)
    }
}

/// Summary statistics of a set of samples.
///
/// The median and 90th percentile are the samples at index
/// `floor(count * 0.5)` and `floor(count * 0.9)` of the sorted samples, with
/// no interpolation. Samples that can't be ordered, such as `f64::NAN`, are
/// left out and not counted.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionSummary<T> {
    pub count: usize,
    pub max: T,
    pub min: T,
    pub median: T,
    pub upper_90: T,
}

impl<T> DistributionSummary<T>
where
    T: Copy + PartialOrd,
{
    /// Summarize `samples`, returning `None` when there are none.
    pub fn from_samples(samples: &[T]) -> Option<Self> {
        let mut sorted: Vec<T> = samples.iter().copied().filter(|v| v.partial_cmp(v).is_some()).collect();
        if sorted.is_empty() {
            return None;
        }

        // Every remaining pair is comparable
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let count = sorted.len();
        let at = |ratio: f64| sorted[((count as f64 * ratio) as usize).min(count - 1)];

        Some(DistributionSummary {
            count,
            max: sorted[count - 1],
            min: sorted[0],
            median: at(0.5),
            upper_90: at(0.9),
        })
    }
}

/// Metrics summarizing the distribution of `samples`, named after `prefix`.
///
/// `<prefix>.count` is always included. When there is at least one sample
/// it's followed by `.max`, `.min`, `.median`, and `.upper_90`. Every metric
/// uses `tick`, or the current minute if not given.
///
/// # Example
///
/// ```
/// use refrain::generate_distribution;
///
/// let metrics = generate_distribution("api.latency", &[5u64, 1, 3], Some(1398063600));
/// let lines: Vec<String> = metrics.iter().map(|m| m.to_string()).collect();
///
/// assert_eq!(
///     vec![
///         "api.latency.count 3 1398063600",
///         "api.latency.max 5 1398063600",
///         "api.latency.min 1 1398063600",
///         "api.latency.median 3 1398063600",
///         "api.latency.upper_90 5 1398063600",
///     ],
///     lines
/// );
/// ```
pub fn generate_distribution<T>(prefix: &str, samples: &[T], tick: Option<u64>) -> Vec<DirectMetric>
where
    T: Copy + PartialOrd + Into<MetricValue>,
{
    let tick = tick.unwrap_or_else(rounded_tick);
    let name = |suffix: &str| format!("{}.{}", prefix, suffix);

    let summary = match DistributionSummary::from_samples(samples) {
        Some(summary) => summary,
        None => return vec![DirectMetric::with_tick(&name("count"), 0u64, tick)],
    };

    vec![
        DirectMetric::with_tick(&name("count"), summary.count as u64, tick),
        DirectMetric::with_tick(&name("max"), summary.max, tick),
        DirectMetric::with_tick(&name("min"), summary.min, tick),
        DirectMetric::with_tick(&name("median"), summary.median, tick),
        DirectMetric::with_tick(&name("upper_90"), summary.upper_90, tick),
    ]
}

/// Writes `DirectMetric`s to a TCP line receiver.
///
/// Every call to `report` opens a new connection, writes the payload in a
/// single write, and closes the connection. Unlike Statsd metrics, errors
/// are returned to the caller.
///
/// # Example
///
/// ```no_run
/// use refrain::{generate_distribution, DirectReporter};
///
/// let reporter = DirectReporter::from_env().unwrap();
/// reporter.report(&generate_distribution("api.latency", &[12u64, 40, 7], None)).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectReporter {
    host: String,
    port: u16,
}

impl DirectReporter {
    pub fn new(host: &str, port: u16) -> Self {
        DirectReporter {
            host: host.to_string(),
            port,
        }
    }

    /// Reporter for the host and port in `DIRECT_METRIC_HOST` and
    /// `DIRECT_METRIC_PORT`, falling back to `127.0.0.1:2003`.
    ///
    /// The variables are read once, here. Use `report_from_env` to pick up
    /// changes made while the process runs.
    pub fn from_env() -> MetricResult<Self> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Like `from_env` but reading variables through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> MetricResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(HOST_ENV)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup(PORT_ENV).filter(|p| !p.is_empty()) {
            Some(p) => p.trim().parse::<u16>().map_err(|_| {
                MetricError::configuration(format!("Invalid value `{}` for {}.", p, PORT_ENV))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(DirectReporter { host, port })
    }

    /// Send `metrics` to the host and port currently in `DIRECT_METRIC_HOST`
    /// and `DIRECT_METRIC_PORT`, reading both on every call.
    pub fn report_from_env<'a, I>(metrics: I) -> MetricResult<()>
    where
        I: IntoIterator<Item = &'a DirectMetric>,
    {
        Self::report_from_env_with(|key| env::var(key).ok(), metrics)
    }

    /// Like `report_from_env` but reading variables through `lookup`.
    pub fn report_from_env_with<'a, F, I>(lookup: F, metrics: I) -> MetricResult<()>
    where
        F: Fn(&str) -> Option<String>,
        I: IntoIterator<Item = &'a DirectMetric>,
    {
        Self::from_env_with(lookup)?.report(metrics)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Payload written for `metrics`: one line per metric, each ending with
    /// a newline.
    pub fn payload<'a, I>(metrics: I) -> String
    where
        I: IntoIterator<Item = &'a DirectMetric>,
    {
        let lines: Vec<String> = metrics.into_iter().map(|m| m.to_string()).collect();
        let mut payload = lines.join("\n");
        payload.push('\n');
        payload
    }

    /// Send `metrics` over a new connection.
    pub fn report<'a, I>(&self, metrics: I) -> MetricResult<()>
    where
        I: IntoIterator<Item = &'a DirectMetric>,
    {
        let payload = Self::payload(metrics);
        debug!("direct metrics to {}:{}: {}", self.host, self.port, payload.trim_end());

        let mut stream = TcpStream::connect((self.host.as_str(), self.port))?;
        stream.write_all(payload.as_bytes())?;
        stream.flush()?;
        Ok(())
    }
}

impl Default for DirectReporter {
    fn default() -> Self {
        DirectReporter::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}
