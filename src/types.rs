// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::builder::{MetricFormatter, MetricValue};
use std::borrow::Cow;
use std::io;
use thiserror::Error;

/// Trait for metrics to expose Statsd metric string slice representation.
///
/// Implementing metrics know how to turn themselves into one of the supported
/// types of metrics as defined in the [Statsd spec](https://github.com/b/statsd_spec).
pub trait Metric {
    fn as_metric_str(&self) -> &str;
}

/// Counters are simple values incremented or decremented by a client.
///
/// See the `Counted` trait for more information.
#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub struct Counter {
    repr: String,
}

impl Counter {
    pub fn new(prefix: &str, key: &str, count: i64) -> Self {
        MetricFormatter::counter(prefix, key, &MetricValue::Signed(count))
            .format()
            .into()
    }
}

impl From<String> for Counter {
    fn from(s: String) -> Self {
        Counter { repr: s }
    }
}

impl Metric for Counter {
    fn as_metric_str(&self) -> &str {
        &self.repr
    }
}

/// Timers are a positive number of milliseconds between a start and end point.
///
/// See the `Timed` trait for more information.
#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub struct Timer {
    repr: String,
}

impl Timer {
    pub fn new(prefix: &str, key: &str, time: u64) -> Self {
        MetricFormatter::timer(prefix, key, &MetricValue::Unsigned(time))
            .format()
            .into()
    }
}

impl From<String> for Timer {
    fn from(s: String) -> Self {
        Timer { repr: s }
    }
}

impl Metric for Timer {
    fn as_metric_str(&self) -> &str {
        &self.repr
    }
}

/// Gauges are an instantaneous value determined by the client.
///
/// See the `Gauged` trait for more information.
#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub struct Gauge {
    repr: String,
}

impl Gauge {
    pub fn new(prefix: &str, key: &str, value: u64) -> Self {
        Self::from_value(prefix, key, &MetricValue::Unsigned(value))
    }

    pub fn new_f64(prefix: &str, key: &str, value: f64) -> Self {
        Self::from_value(prefix, key, &MetricValue::Float(value))
    }

    pub(crate) fn from_value(prefix: &str, key: &str, value: &MetricValue) -> Self {
        MetricFormatter::gauge(prefix, key, value).format().into()
    }
}

impl From<String> for Gauge {
    fn from(s: String) -> Self {
        Gauge { repr: s }
    }
}

impl Metric for Gauge {
    fn as_metric_str(&self) -> &str {
        &self.repr
    }
}

/// Sets count the number of unique elements in a group.
///
/// See the `Setted` trait for more information.
#[derive(PartialEq, Eq, Debug, Hash, Clone)]
pub struct Set {
    repr: String,
}

impl Set {
    pub fn new(prefix: &str, key: &str, value: &str) -> Self {
        MetricFormatter::set(prefix, key, &MetricValue::Text(value.to_string()))
            .format()
            .into()
    }
}

impl From<String> for Set {
    fn from(s: String) -> Self {
        Set { repr: s }
    }
}

impl Metric for Set {
    fn as_metric_str(&self) -> &str {
        &self.repr
    }
}

/// Potential categories an error from this library falls into.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ErrorKind {
    /// A metric call was made with an argument that can never be valid,
    /// such as an empty metric name.
    InvalidArgument,
    /// The metrics configuration is missing a required value or contains
    /// fields that aren't understood.
    Configuration,
    /// An I/O error was encountered talking to a socket.
    IoError,
}

#[derive(Debug, Error)]
enum ErrorRepr {
    #[error("{1}")]
    WithDescription(ErrorKind, Cow<'static, str>),
    #[error(transparent)]
    IoError(#[from] io::Error),
}

/// Error generated by this library potentially wrapping another
/// type of error (exposed via the `Error` trait).
#[derive(Debug, Error)]
#[error(transparent)]
pub struct MetricError {
    repr: ErrorRepr,
}

impl MetricError {
    /// Return the kind of the error
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::IoError(_) => ErrorKind::IoError,
            ErrorRepr::WithDescription(kind, _) => kind,
        }
    }

    pub(crate) fn invalid_argument(desc: &'static str) -> Self {
        MetricError::from((ErrorKind::InvalidArgument, desc))
    }

    pub(crate) fn configuration<S: Into<Cow<'static, str>>>(desc: S) -> Self {
        MetricError {
            repr: ErrorRepr::WithDescription(ErrorKind::Configuration, desc.into()),
        }
    }
}

impl From<io::Error> for MetricError {
    fn from(err: io::Error) -> MetricError {
        MetricError {
            repr: ErrorRepr::IoError(err),
        }
    }
}

impl From<(ErrorKind, &'static str)> for MetricError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> MetricError {
        MetricError {
            repr: ErrorRepr::WithDescription(kind, Cow::Borrowed(desc)),
        }
    }
}

pub type MetricResult<T> = Result<T, MetricError>;

#[cfg(test)]
mod tests {
    use super::{Counter, ErrorKind, Gauge, Metric, MetricError, Set, Timer};
    use std::io;

    #[test]
    fn test_counter_to_metric_string() {
        let counter = Counter::new("my.app.", "test.counter", 4);
        assert_eq!("my.app.test.counter:4|c", counter.as_metric_str());
    }

    #[test]
    fn test_counter_negative_to_metric_string() {
        let counter = Counter::new("", "test.counter", -1);
        assert_eq!("test.counter:-1|c", counter.as_metric_str());
    }

    #[test]
    fn test_timer_to_metric_string() {
        let timer = Timer::new("my.app.", "test.timer", 34);
        assert_eq!("my.app.test.timer:34|ms", timer.as_metric_str());
    }

    #[test]
    fn test_gauge_to_metric_string() {
        let gauge = Gauge::new("my.app.", "test.gauge", 2);
        assert_eq!("my.app.test.gauge:2|g", gauge.as_metric_str());
    }

    #[test]
    fn test_gauge_f64_to_metric_string() {
        let gauge = Gauge::new_f64("my.app.", "test.gauge", 2.5);
        assert_eq!("my.app.test.gauge:2.5|g", gauge.as_metric_str());
    }

    #[test]
    fn test_set_to_metric_string() {
        let set = Set::new("my.app.", "login", "joe@example.com");
        assert_eq!("my.app.login:joe@example.com|s", set.as_metric_str());
    }

    #[test]
    fn test_metric_error_kind_io_error() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "Broken pipe");
        let our_err = MetricError::from(io_err);
        assert_eq!(ErrorKind::IoError, our_err.kind());
        assert_eq!("Broken pipe", our_err.to_string());
    }

    #[test]
    fn test_metric_error_kind_invalid_argument() {
        let our_err = MetricError::invalid_argument("Must specify a metric name.");
        assert_eq!(ErrorKind::InvalidArgument, our_err.kind());
        assert_eq!("Must specify a metric name.", our_err.to_string());
    }

    #[test]
    fn test_metric_error_kind_configuration() {
        let our_err = MetricError::configuration(format!("missing {}", "service_name"));
        assert_eq!(ErrorKind::Configuration, our_err.kind());
        assert_eq!("missing service_name", our_err.to_string());
    }
}
