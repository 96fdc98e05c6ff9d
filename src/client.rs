// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::batch::Batch;
use crate::builder::{MetricFormatter, MetricValue};
use crate::config::ClientConfig;
use crate::gauges::{GaugeCache, GaugeCacheKey};
use crate::name::{namespace_prefix, MetricNamer, StatKind};
use crate::sealed::Sealed;
use crate::sinks::{SharedSink, Transport};
use crate::types::{Counter, ErrorKind, Gauge, Metric, MetricError, MetricResult, Set, Timer};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Conversion trait for valid values for counters
///
/// This trait must be implemented for any types that are used as counter
/// values (currently only `i64`). This trait is internal to how values are
/// formatted as part of metrics but is exposed publicly for documentation
/// purposes.
pub trait ToCounterValue {
    fn try_to_value(self) -> MetricResult<MetricValue>;
}

impl ToCounterValue for i64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Signed(self))
    }
}

/// Conversion trait for valid values for timers
///
/// This trait must be implemented for any types that are used as timer
/// values (currently `u64` and `Duration`).
pub trait ToTimerValue {
    fn try_to_value(self) -> MetricResult<MetricValue>;
}

impl ToTimerValue for u64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Unsigned(self))
    }
}

impl ToTimerValue for Duration {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        rounded_millis(self).map(MetricValue::Unsigned)
    }
}

/// Whole milliseconds in `d`, rounding half a millisecond up.
pub(crate) fn rounded_millis(d: Duration) -> MetricResult<u64> {
    let millis = (d.as_nanos() + 500_000) / 1_000_000;
    if millis > u64::MAX as u128 {
        Err(MetricError::from((ErrorKind::InvalidArgument, "u64 overflow")))
    } else {
        Ok(millis as u64)
    }
}

/// Conversion trait for valid values for gauges
///
/// This trait must be implemented for any types that are used as gauge
/// values (currently `i64`, `u64`, and `f64`).
pub trait ToGaugeValue {
    fn try_to_value(self) -> MetricResult<MetricValue>;
}

impl ToGaugeValue for i64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Signed(self))
    }
}

impl ToGaugeValue for u64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Unsigned(self))
    }
}

impl ToGaugeValue for f64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Float(self))
    }
}

/// Conversion trait for valid values for sets
///
/// Sets accept integers as well as arbitrary strings, which are sent
/// verbatim.
pub trait ToSetValue {
    fn try_to_value(self) -> MetricResult<MetricValue>;
}

impl ToSetValue for i64 {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Signed(self))
    }
}

impl ToSetValue for &str {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Text(self.to_string()))
    }
}

impl ToSetValue for String {
    fn try_to_value(self) -> MetricResult<MetricValue> {
        Ok(MetricValue::Text(self))
    }
}

/// Trait for incrementing and decrementing counters.
///
/// Counters are simple values incremented or decremented by a client. The
/// rates at which these events occur or average values will be determined
/// by the server receiving them. Counters are sent once per call and are
/// never re-published.
///
/// Counter names have `counter` appended, followed by the server and
/// sub-server labels of the client.
pub trait Counted<T>
where
    T: ToCounterValue,
{
    /// Increment or decrement the counter by the given amount
    fn count(&self, key: &str, count: T) -> MetricResult<Counter>;

    /// Alias of `count`
    fn counter(&self, key: &str, count: T) -> MetricResult<Counter> {
        self.count(key, count)
    }
}

/// Trait for convenience methods for counters
pub trait CountedExt: Counted<i64> {
    /// Increment the counter by 1
    fn increment(&self, key: &str) -> MetricResult<Counter> {
        self.count(key, 1)
    }

    /// Decrement the counter by 1
    fn decrement(&self, key: &str) -> MetricResult<Counter> {
        self.count(key, -1)
    }
}

/// Trait for recording timings in milliseconds.
///
/// Timings are a positive number of milliseconds between a start and end
/// time. `Duration` values are converted to milliseconds, rounding half a
/// millisecond up, before being recorded.
///
/// The following types are valid for timers:
/// * `u64`
/// * `Duration`
pub trait Timed<T>
where
    T: ToTimerValue,
{
    /// Record a timing in milliseconds with the given key
    fn time(&self, key: &str, time: T) -> MetricResult<Timer>;
}

/// Trait for timing blocks of code.
pub trait TimedExt {
    /// Start building a timer for `key`.
    ///
    /// Exactly one of an explicit number of milliseconds (`with_millis` then
    /// `send`) or a closure to time (`run` or `run_with_timing`) must be
    /// given.
    fn timer<'a>(&'a self, key: &'a str) -> TimerBuilder<'a, Self>
    where
        Self: Sized;

    /// Run `f`, record how long it took, and return its result.
    fn time_fn<F, R>(&self, key: &str, f: F) -> MetricResult<R>
    where
        Self: Sized,
        F: FnOnce() -> R;
}

/// Trait for recording gauge values.
///
/// Gauge values are an instantaneous measurement of a value determined
/// by the client. Every gauge is stored in the client's gauge cache before
/// being sent, and the cache sends the last value of each gauge again on a
/// fixed period so it never goes stale.
///
/// The following types are valid for gauges:
/// * `i64`
/// * `u64`
/// * `f64`
pub trait Gauged<T>
where
    T: ToGaugeValue,
{
    /// Record a gauge value with the given key
    fn gauge(&self, key: &str, value: T) -> MetricResult<Gauge>;
}

/// Trait for removing gauges from re-publication.
pub trait GaugedExt {
    /// Stop re-publishing the gauge with the given key.
    ///
    /// Nothing is sent; the gauge is only marked as having no value in the
    /// gauge cache.
    fn clear_gauge(&self, key: &str) -> MetricResult<()>;
}

/// Trait for recording set values.
///
/// Sets count the number of unique elements in a group. Set names only
/// have the server and sub-server labels appended, no stat kind.
///
/// The following types are valid for sets:
/// * `i64`
/// * `&str`
/// * `String`
pub trait Setted<T>
where
    T: ToSetValue,
{
    /// Record a single set value with the given key
    fn set(&self, key: &str, value: T) -> MetricResult<Set>;
}

/// Trait that encompasses all other traits for sending metrics.
///
/// If you wish to use `MetricsClient` with a generic type or place a
/// `MetricsClient` instance behind a pointer (such as a `Box`) this will
/// allow you to reference all the implemented methods for recording metrics,
/// while using a single trait.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use refrain::prelude::*;
/// use refrain::{ClientConfig, MetricsClient, NopMetricSink};
///
/// let config = ClientConfig::default().with_service_name("billing");
/// let client: Box<dyn MetricClient> = Box::new(MetricsClient::from_sink(config, Arc::new(NopMetricSink)));
///
/// client.count("some.counter", 1).unwrap();
/// client.increment("some.counter").unwrap();
/// client.time("some.timer", 42).unwrap();
/// client.gauge("some.gauge", 8u64).unwrap();
/// client.gauge("some.gauge", 8.5).unwrap();
/// client.set("some.set", 5).unwrap();
/// client.set("some.set", "joe".to_string()).unwrap();
/// ```
pub trait MetricClient:
    Counted<i64>
    + CountedExt
    + Timed<u64>
    + Timed<Duration>
    + Gauged<i64>
    + Gauged<u64>
    + Gauged<f64>
    + GaugedExt
    + Setted<i64>
    + Setted<String>
{
}

/// Typically internal client methods for naming and sending metrics.
///
/// Both `MetricsClient` and `Batch` implement this trait, and every metric
/// trait is implemented for anything that implements it. The difference
/// between the two is only where `send_metric` writes to.
///
/// This trait is not exposed in the `prelude` module since it isn't required
/// to use the client for sending metrics. It is only exposed in the `ext`
/// module which is used to encompass advanced extension points for the library.
///
/// NOTE: This is a sealed trait and so it cannot be implemented outside of the
/// library.
pub trait MetricBackend: Sealed {
    /// Full name of a metric, without the namespace, failing if `key` is empty.
    fn metric_name(&self, key: &str, kind: StatKind) -> MetricResult<String>;

    /// Namespace prefix, including the trailing `.`, or an empty string.
    fn prefix(&self) -> &str;

    /// Cache that gauges are stored in before being sent.
    fn gauges(&self) -> &GaugeCache;

    /// Send a full formed `Metric` implementation
    ///
    /// Sending is best effort: failures of the underlying sink are logged
    /// and dropped rather than returned.
    fn send_metric<M>(&self, metric: &M) -> MetricResult<()>
    where
        M: Metric;
}

impl<T, B> Counted<T> for B
where
    T: ToCounterValue,
    B: MetricBackend,
{
    fn count(&self, key: &str, count: T) -> MetricResult<Counter> {
        let name = self.metric_name(key, StatKind::Counter)?;
        let value = count.try_to_value()?;
        let metric: Counter = MetricFormatter::counter(self.prefix(), &name, &value).format().into();
        self.send_metric(&metric)?;
        Ok(metric)
    }
}

impl<B> CountedExt for B where B: MetricBackend {}

impl<T, B> Timed<T> for B
where
    T: ToTimerValue,
    B: MetricBackend,
{
    fn time(&self, key: &str, time: T) -> MetricResult<Timer> {
        let name = self.metric_name(key, StatKind::Timer)?;
        let value = time.try_to_value()?;
        let metric: Timer = MetricFormatter::timer(self.prefix(), &name, &value).format().into();
        self.send_metric(&metric)?;
        Ok(metric)
    }
}

impl<B> TimedExt for B
where
    B: MetricBackend,
{
    fn timer<'a>(&'a self, key: &'a str) -> TimerBuilder<'a, Self> {
        TimerBuilder {
            client: self,
            key,
            millis: None,
        }
    }

    fn time_fn<F, R>(&self, key: &str, f: F) -> MetricResult<R>
    where
        F: FnOnce() -> R,
    {
        self.timer(key).run(f)
    }
}

impl<T, B> Gauged<T> for B
where
    T: ToGaugeValue,
    B: MetricBackend,
{
    fn gauge(&self, key: &str, value: T) -> MetricResult<Gauge> {
        let name = self.metric_name(key, StatKind::Gauge)?;
        let value = value.try_to_value()?;
        self.gauges().set(&name, Some(value.clone()));
        let metric: Gauge = MetricFormatter::gauge(self.prefix(), &name, &value).format().into();
        self.send_metric(&metric)?;
        Ok(metric)
    }
}

impl<B> GaugedExt for B
where
    B: MetricBackend,
{
    fn clear_gauge(&self, key: &str) -> MetricResult<()> {
        let name = self.metric_name(key, StatKind::Gauge)?;
        self.gauges().set(&name, None);
        Ok(())
    }
}

impl<T, B> Setted<T> for B
where
    T: ToSetValue,
    B: MetricBackend,
{
    fn set(&self, key: &str, value: T) -> MetricResult<Set> {
        let name = self.metric_name(key, StatKind::Set)?;
        let value = value.try_to_value()?;
        let metric: Set = MetricFormatter::set(self.prefix(), &name, &value).format().into();
        self.send_metric(&metric)?;
        Ok(metric)
    }
}

impl<B> MetricClient for B where B: MetricBackend {}

/// Builder for timers created by `TimedExt::timer`.
///
/// The metric name is validated before anything else, then the builder
/// checks that exactly one of an explicit duration or a closure was given.
/// The closure is only run once both checks pass.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use refrain::prelude::*;
/// use refrain::{ClientConfig, MetricsClient, NopMetricSink};
///
/// let client = MetricsClient::from_sink(ClientConfig::default(), Arc::new(NopMetricSink));
///
/// let rows = client.timer("query").run(|| 42).unwrap();
/// assert_eq!(42, rows);
///
/// let (rows, millis) = client.timer("query").run_with_timing(|| 42).unwrap();
/// assert_eq!(42, rows);
/// assert!(millis < 1000);
///
/// client.timer("query").with_millis(320).send().unwrap();
/// assert!(client.timer("query").with_millis(320).run(|| 42).is_err());
/// ```
#[must_use = "Did you forget to call .send() or .run() on the timer?"]
pub struct TimerBuilder<'a, C> {
    client: &'a C,
    key: &'a str,
    millis: Option<u64>,
}

impl<'a, C> TimerBuilder<'a, C>
where
    C: MetricBackend,
{
    /// Record an explicit number of milliseconds instead of timing a closure.
    pub fn with_millis(mut self, millis: u64) -> Self {
        self.millis = Some(millis);
        self
    }

    /// Send the explicit number of milliseconds given by `with_millis`.
    pub fn send(self) -> MetricResult<Timer> {
        self.client.metric_name(self.key, StatKind::Timer)?;
        match self.millis {
            Some(millis) => self.client.time(self.key, millis),
            None => Err(exactly_one_error()),
        }
    }

    /// Time `f`, record the elapsed milliseconds, and return its result.
    pub fn run<F, R>(self, f: F) -> MetricResult<R>
    where
        F: FnOnce() -> R,
    {
        self.run_with_timing(f).map(|(result, _)| result)
    }

    /// Time `f`, record the elapsed milliseconds, and return its result
    /// along with the milliseconds recorded.
    pub fn run_with_timing<F, R>(self, f: F) -> MetricResult<(R, u64)>
    where
        F: FnOnce() -> R,
    {
        self.client.metric_name(self.key, StatKind::Timer)?;
        if self.millis.is_some() {
            return Err(exactly_one_error());
        }

        let start = Instant::now();
        let result = f();
        let millis = rounded_millis(start.elapsed())?;
        self.client.time(self.key, millis)?;
        Ok((result, millis))
    }
}

impl<'a, C> fmt::Debug for TimerBuilder<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerBuilder")
            .field("key", &self.key)
            .field("millis", &self.millis)
            .finish()
    }
}

fn exactly_one_error() -> MetricError {
    MetricError::invalid_argument("Must pass exactly one of milliseconds or block.")
}

/// Client for Statsd that implements various traits to record metrics.
///
/// # Traits
///
/// The client is the main entry point for users of this library. It supports
/// several traits for recording metrics of different types.
///
/// * `Counted` for emitting counters.
/// * `Timed` and `TimedExt` for emitting timings.
/// * `Gauged` for emitting gauge values, which are also re-published.
/// * `Setted` for emitting set values.
/// * `MetricClient` for a combination of all of the above.
///
/// For more information about the uses for each type of metric, see the
/// documentation for each mentioned trait.
///
/// # Naming
///
/// Each metric is named `<namespace>.<key>.<kind>.<server label>.<sub-server label>`
/// where the namespace, kind, and labels are omitted when absent. See
/// `MetricNamer` for details.
///
/// # Sending
///
/// Metrics are sent as soon as they are recorded, unless recorded on a
/// `Batch` created by the `batch` method. Sending is best effort: failures
/// are logged and never returned to the caller.
///
/// # Sharing
///
/// Clients are normally obtained from a `MetricsRegistry`, which returns the
/// same `Arc<MetricsClient>` for every equal `ClientConfig`. A client can be
/// shared between threads; each thread sends through its own socket.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use refrain::prelude::*;
/// use refrain::{ClientConfig, MetricsClient, SpyMetricSink};
///
/// let (rx, sink) = SpyMetricSink::new();
/// let config = ClientConfig::default().with_namespace("unicorn").with_server_label("prod-fe1");
/// let client = MetricsClient::from_sink(config, Arc::new(sink));
///
/// client.increment("test_runs").unwrap();
/// assert_eq!(b"unicorn.test_runs.counter.prod-fe1:1|c".to_vec(), rx.recv().unwrap());
/// ```
pub struct MetricsClient {
    config: ClientConfig,
    prefix: String,
    namer: MetricNamer,
    transport: Transport,
    gauges: Arc<GaugeCache>,
    batch_size: Option<usize>,
}

impl MetricsClient {
    /// Create a client that sends through `sink` with its own gauge cache.
    ///
    /// The gauge cache of a client created this way has no background
    /// reporter; call `report` on it to re-publish gauges. Use a
    /// `MetricsRegistry` to get clients whose gauges are re-published
    /// automatically.
    pub fn from_sink(config: ClientConfig, sink: SharedSink) -> Self {
        let gauges = Arc::new(GaugeCache::new(GaugeCacheKey::from_config(&config), Arc::clone(&sink)));
        Self::new(config, Transport::new(sink, true), gauges, None)
    }

    pub(crate) fn new(
        config: ClientConfig,
        transport: Transport,
        gauges: Arc<GaugeCache>,
        batch_size: Option<usize>,
    ) -> Self {
        let prefix = namespace_prefix(config.effective_namespace().as_deref());
        let namer = MetricNamer::new(config.server_label.as_deref(), config.sub_server_name.as_deref());

        MetricsClient {
            config,
            prefix,
            namer,
            transport,
            gauges,
            batch_size,
        }
    }

    /// Run `body` with a `Batch` that joins the metrics it records into as
    /// few datagrams as the batch size allows.
    ///
    /// Buffered metrics are sent when `body` returns and also when it
    /// panics, before the panic continues to unwind.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use refrain::prelude::*;
    /// use refrain::{ClientConfig, MetricsClient, SpyMetricSink};
    ///
    /// let (rx, sink) = SpyMetricSink::new();
    /// let client = MetricsClient::from_sink(ClientConfig::default(), Arc::new(sink));
    ///
    /// client.batch(|batch| {
    ///     batch.increment("jobs").unwrap();
    ///     batch.gauge("queue", 3u64).unwrap();
    /// });
    ///
    /// assert_eq!(b"jobs.counter:1|c\nqueue.gauge:3|g".to_vec(), rx.recv().unwrap());
    /// ```
    pub fn batch<F, R>(&self, body: F) -> R
    where
        F: FnOnce(&Batch<'_>) -> R,
    {
        let batch = Batch::new(self, self.transport.writer(), self.batch_size);
        body(&batch)
    }

    /// Flush the underlying sink
    pub fn flush(&self) -> MetricResult<()> {
        Ok(self.transport.sink().flush()?)
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn cluster_name(&self) -> Option<&str> {
        self.config.cluster_name.as_deref()
    }

    pub fn service_name(&self) -> Option<&str> {
        self.config.service_name.as_deref()
    }

    pub fn server_label(&self) -> Option<&str> {
        self.namer.server_label()
    }

    /// Alias of `server_label`
    pub fn server_name(&self) -> Option<&str> {
        self.server_label()
    }

    pub fn sub_server_name(&self) -> Option<&str> {
        self.namer.sub_server_name()
    }

    /// Namespace prepended to metric names, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.prefix.strip_suffix('.')
    }

    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    pub fn gauge_cache(&self) -> &Arc<GaugeCache> {
        &self.gauges
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Sealed for MetricsClient {}

impl MetricBackend for MetricsClient {
    fn metric_name(&self, key: &str, kind: StatKind) -> MetricResult<String> {
        self.namer.name(key, kind)
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn gauges(&self) -> &GaugeCache {
        &self.gauges
    }

    fn send_metric<M>(&self, metric: &M) -> MetricResult<()>
    where
        M: Metric,
    {
        self.transport.send(metric.as_metric_str());
        Ok(())
    }
}

impl fmt::Debug for MetricsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsClient")
            .field("config", &self.config)
            .field("prefix", &self.prefix)
            .field("transport", &self.transport)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        rounded_millis, Counted, CountedExt, Gauged, GaugedExt, MetricClient, MetricsClient, Setted, Timed, TimedExt,
    };
    use crate::builder::MetricValue;
    use crate::config::ClientConfig;
    use crate::sinks::{MetricSink, NopMetricSink, SpyMetricSink};
    use crate::types::{ErrorKind, Metric};
    use crossbeam_channel::Receiver;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn unicorn() -> ClientConfig {
        ClientConfig::default()
            .with_namespace("unicorn")
            .with_server_label("prod-fe1")
    }

    fn spy_client(config: ClientConfig) -> (Receiver<Vec<u8>>, MetricsClient) {
        let (rx, sink) = SpyMetricSink::new();
        (rx, MetricsClient::from_sink(config, Arc::new(sink)))
    }

    fn drain(rx: &Receiver<Vec<u8>>) -> Vec<String> {
        rx.try_iter().map(|v| String::from_utf8(v).unwrap()).collect()
    }

    struct CountingSink {
        emitted: AtomicUsize,
        fail: bool,
    }

    impl MetricSink for CountingSink {
        fn emit(&self, metric: &str) -> io::Result<usize> {
            self.emitted.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
            } else {
                Ok(metric.len())
            }
        }
    }

    fn counting(fail: bool) -> Arc<CountingSink> {
        Arc::new(CountingSink {
            emitted: AtomicUsize::new(0),
            fail,
        })
    }

    #[test]
    fn test_rounded_millis() {
        assert_eq!(0, rounded_millis(Duration::from_micros(499)).unwrap());
        assert_eq!(1, rounded_millis(Duration::from_micros(500)).unwrap());
        assert_eq!(2, rounded_millis(Duration::from_micros(1500)).unwrap());
        assert_eq!(1000, rounded_millis(Duration::from_secs(1)).unwrap());
    }

    #[test]
    fn test_counter_round_trip_format() {
        let (rx, client) = spy_client(unicorn());
        let res = client.counter("test_runs", 1).unwrap();

        assert_eq!("unicorn.test_runs.counter.prod-fe1:1|c", res.as_metric_str());
        assert_eq!(vec!["unicorn.test_runs.counter.prod-fe1:1|c"], drain(&rx));
    }

    #[test]
    fn test_increment_and_decrement() {
        let (rx, client) = spy_client(unicorn());
        client.increment("logins").unwrap();
        client.decrement("logins").unwrap();

        assert_eq!(
            vec![
                "unicorn.logins.counter.prod-fe1:1|c",
                "unicorn.logins.counter.prod-fe1:-1|c"
            ],
            drain(&rx)
        );
    }

    #[test]
    fn test_sub_server_name_appended() {
        let (rx, client) = spy_client(unicorn().with_sub_server_name("worker3"));
        client.count("jobs", 4).unwrap();

        assert_eq!(vec!["unicorn.jobs.counter.prod-fe1.worker3:4|c"], drain(&rx));
    }

    #[test]
    fn test_default_namespace_from_cluster_and_service() {
        let config = ClientConfig::default().with_cluster_name("west").with_service_name("billing");
        let (rx, client) = spy_client(config);
        client.count("jobs", 1).unwrap();

        assert_eq!(Some("west.billing"), client.namespace());
        assert_eq!(vec!["west.billing.jobs.counter:1|c"], drain(&rx));
    }

    #[test]
    fn test_no_namespace() {
        let (rx, client) = spy_client(ClientConfig::default());
        client.count("jobs", 1).unwrap();

        assert_eq!(None, client.namespace());
        assert_eq!(vec!["jobs.counter:1|c"], drain(&rx));
    }

    #[test]
    fn test_gauge_caches_then_sends() {
        let (rx, client) = spy_client(unicorn());
        client.gauge("my_test_metric", 5u64).unwrap();

        assert_eq!(
            Some(Some(MetricValue::Unsigned(5))),
            client.gauge_cache().get("my_test_metric.gauge.prod-fe1")
        );
        assert_eq!(vec!["unicorn.my_test_metric.gauge.prod-fe1:5|g"], drain(&rx));
    }

    #[test]
    fn test_gauge_float_and_negative() {
        let (rx, client) = spy_client(unicorn());
        client.gauge("load", 1.25).unwrap();
        client.gauge("delta", -3i64).unwrap();

        assert_eq!(
            vec!["unicorn.load.gauge.prod-fe1:1.25|g", "unicorn.delta.gauge.prod-fe1:-3|g"],
            drain(&rx)
        );
    }

    #[test]
    fn test_clear_gauge() {
        let (rx, client) = spy_client(unicorn());
        client.gauge("memory", 128000u64).unwrap();
        client.clear_gauge("memory").unwrap();

        assert_eq!(Some(None), client.gauge_cache().get("memory.gauge.prod-fe1"));
        assert_eq!(1, drain(&rx).len());
        assert_eq!(0, client.gauge_cache().report());
    }

    #[test]
    fn test_set_has_no_stat_kind() {
        let (rx, client) = spy_client(unicorn());
        client.set("visitors", "user-42").unwrap();
        client.set("visitors", 42i64).unwrap();

        assert_eq!(
            vec!["unicorn.visitors.prod-fe1:user-42|s", "unicorn.visitors.prod-fe1:42|s"],
            drain(&rx)
        );
    }

    #[test]
    fn test_time_explicit() {
        let (rx, client) = spy_client(unicorn());
        client.time("render", 320).unwrap();
        client.time("render", Duration::from_micros(1500)).unwrap();

        assert_eq!(
            vec!["unicorn.render.timer.prod-fe1:320|ms", "unicorn.render.timer.prod-fe1:2|ms"],
            drain(&rx)
        );
    }

    #[test]
    fn test_timer_run_returns_result() {
        let (rx, client) = spy_client(unicorn());
        let res = client.timer("render").run(|| "done").unwrap();

        assert_eq!("done", res);
        let sent = drain(&rx);
        assert_eq!(1, sent.len());
        assert!(sent[0].starts_with("unicorn.render.timer.prod-fe1:"));
        assert!(sent[0].ends_with("|ms"));
    }

    #[test]
    fn test_timer_run_with_timing() {
        let (rx, client) = spy_client(unicorn());
        let (res, millis) = client
            .timer("render")
            .run_with_timing(|| {
                std::thread::sleep(Duration::from_millis(5));
                7
            })
            .unwrap();

        assert_eq!(7, res);
        assert!(millis >= 5);
        assert_eq!(vec![format!("unicorn.render.timer.prod-fe1:{}|ms", millis)], drain(&rx));
    }

    #[test]
    fn test_timer_with_millis() {
        let (rx, client) = spy_client(unicorn());
        client.timer("render").with_millis(12).send().unwrap();

        assert_eq!(vec!["unicorn.render.timer.prod-fe1:12|ms"], drain(&rx));
    }

    #[test]
    fn test_time_fn() {
        let (_rx, client) = spy_client(unicorn());
        assert_eq!(3, client.time_fn("render", || 1 + 2).unwrap());
    }

    #[test]
    fn test_timer_requires_exactly_one() {
        let sink = counting(false);
        let client = MetricsClient::from_sink(unicorn(), sink.clone());
        let ran = AtomicUsize::new(0);

        let neither = client.timer("render").send().unwrap_err();
        let both = client
            .timer("render")
            .with_millis(5)
            .run(|| ran.fetch_add(1, Ordering::SeqCst))
            .unwrap_err();

        assert_eq!(ErrorKind::InvalidArgument, neither.kind());
        assert_eq!("Must pass exactly one of milliseconds or block.", both.to_string());
        assert_eq!(0, ran.load(Ordering::SeqCst));
        assert_eq!(0, sink.emitted.load(Ordering::SeqCst));
    }

    #[test]
    fn test_empty_name_fails_before_io() {
        let sink = counting(false);
        let client = MetricsClient::from_sink(unicorn(), sink.clone());

        let errors = vec![
            client.count("", 1).unwrap_err(),
            client.increment("").unwrap_err(),
            client.decrement("").unwrap_err(),
            client.gauge("", 1u64).unwrap_err(),
            client.set("", 1i64).unwrap_err(),
            client.time("", 1u64).unwrap_err(),
            client.timer("").run(|| ()).unwrap_err(),
            client.timer("").with_millis(1).send().unwrap_err(),
            client.clear_gauge("").unwrap_err(),
        ];

        for err in errors {
            assert_eq!(ErrorKind::InvalidArgument, err.kind());
            assert_eq!("Must specify a metric name.", err.to_string());
        }
        assert_eq!(0, sink.emitted.load(Ordering::SeqCst));
        assert!(client.gauge_cache().is_empty());
    }

    #[test]
    fn test_empty_name_checked_before_timer_arguments() {
        let client = MetricsClient::from_sink(unicorn(), Arc::new(NopMetricSink));
        let err = client.timer("").send().unwrap_err();

        assert_eq!("Must specify a metric name.", err.to_string());
    }

    #[test]
    fn test_send_failures_are_swallowed() {
        let sink = counting(true);
        let client = MetricsClient::from_sink(unicorn(), sink.clone());

        assert!(client.count("jobs", 1).is_ok());
        assert!(client.gauge("queue", 2u64).is_ok());
        assert_eq!(2, sink.emitted.load(Ordering::SeqCst));
    }

    #[test]
    fn test_accessors() {
        let config = ClientConfig::default()
            .with_host("10.0.0.5")
            .with_port(9125)
            .with_cluster_name("west")
            .with_service_name("billing")
            .with_server_label("prod-fe1")
            .with_sub_server_name("worker3");
        let client = MetricsClient::from_sink(config.clone(), Arc::new(NopMetricSink));

        assert_eq!("10.0.0.5", client.host());
        assert_eq!(9125, client.port());
        assert_eq!(Some("west"), client.cluster_name());
        assert_eq!(Some("billing"), client.service_name());
        assert_eq!(Some("prod-fe1"), client.server_label());
        assert_eq!(Some("prod-fe1"), client.server_name());
        assert_eq!(Some("worker3"), client.sub_server_name());
        assert_eq!(Some("west.billing"), client.namespace());
        assert_eq!(&config, client.config());
    }

    #[test]
    fn test_client_as_counted() {
        let client: Box<dyn Counted<i64>> = Box::new(MetricsClient::from_sink(unicorn(), Arc::new(NopMetricSink)));
        client.count("some.counter", 5).unwrap();
    }

    #[test]
    fn test_client_as_gauged_f64() {
        let client: Box<dyn Gauged<f64>> = Box::new(MetricsClient::from_sink(unicorn(), Arc::new(NopMetricSink)));
        client.gauge("some.gauge", 3.2).unwrap();
    }

    #[test]
    fn test_client_as_setted_string() {
        let client: Box<dyn Setted<String>> = Box::new(MetricsClient::from_sink(unicorn(), Arc::new(NopMetricSink)));
        client.set("some.set", "abc".to_string()).unwrap();
    }

    #[test]
    fn test_client_as_timed_duration() {
        let client: Box<dyn Timed<Duration>> = Box::new(MetricsClient::from_sink(unicorn(), Arc::new(NopMetricSink)));
        client.time("some.timer", Duration::from_millis(20)).unwrap();
    }

    #[test]
    fn test_client_as_thread_safe() {
        let client: Box<dyn MetricClient + Send + Sync> =
            Box::new(MetricsClient::from_sink(unicorn(), Arc::new(NopMetricSink)));

        client.count("some.counter", 3).unwrap();
        client.increment("some.counter").unwrap();
        client.time("some.timer", 198).unwrap();
        client.time("some.timer", Duration::from_millis(198)).unwrap();
        client.gauge("some.gauge", 4u64).unwrap();
        client.gauge("some.gauge", 4.0).unwrap();
        client.gauge("some.gauge", -4i64).unwrap();
        client.set("some.set", 5i64).unwrap();
        client.clear_gauge("some.gauge").unwrap();
    }
}
