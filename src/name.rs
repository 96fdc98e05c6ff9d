// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::types::{MetricError, MetricResult};

const NAME_SEPARATOR: char = '.';

/// Kind of statistic a metric name is being built for.
///
/// Every kind except `Set` contributes a segment to the metric name, placed
/// directly after the name the caller supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    Counter,
    Gauge,
    Timer,
    Set,
}

impl StatKind {
    pub fn segment(&self) -> Option<&'static str> {
        match *self {
            StatKind::Counter => Some("counter"),
            StatKind::Gauge => Some("gauge"),
            StatKind::Timer => Some("timer"),
            StatKind::Set => None,
        }
    }
}

/// Builds the name part of each metric a client emits.
///
/// Names are composed of the user supplied name, the stat kind, the server
/// label, and the sub-server label, joined with `.` in that order. Parts
/// that are absent or empty are left out. The namespace is not part of the
/// name; it's applied as a prefix when the metric is formatted.
///
/// # Example
///
/// ```
/// use refrain::{MetricNamer, StatKind};
///
/// let namer = MetricNamer::new(Some("prod-fe1"), None);
/// assert_eq!("test_runs.counter.prod-fe1", namer.name("test_runs", StatKind::Counter).unwrap());
/// assert_eq!("visitors.prod-fe1", namer.name("visitors", StatKind::Set).unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MetricNamer {
    server_label: Option<String>,
    sub_server_name: Option<String>,
}

impl MetricNamer {
    pub fn new(server_label: Option<&str>, sub_server_name: Option<&str>) -> Self {
        MetricNamer {
            server_label: non_empty(server_label),
            sub_server_name: non_empty(sub_server_name),
        }
    }

    /// Build the full name of a metric, failing if `key` is empty.
    pub fn name(&self, key: &str, kind: StatKind) -> MetricResult<String> {
        if key.is_empty() {
            return Err(MetricError::invalid_argument("Must specify a metric name."));
        }

        let parts = [
            Some(key),
            kind.segment(),
            self.server_label.as_deref(),
            self.sub_server_name.as_deref(),
        ];

        let size = parts.iter().flatten().map(|p| p.len() + 1).sum();
        let mut out = String::with_capacity(size);
        for part in parts.iter().flatten() {
            if !out.is_empty() {
                out.push(NAME_SEPARATOR);
            }
            out.push_str(part);
        }

        Ok(out)
    }

    pub fn server_label(&self) -> Option<&str> {
        self.server_label.as_deref()
    }

    pub fn sub_server_name(&self) -> Option<&str> {
        self.sub_server_name.as_deref()
    }
}

/// Turn an optional namespace into the prefix prepended to every metric.
///
/// Trailing separators are trimmed from the namespace before exactly one is
/// appended. A missing or empty namespace results in no prefix.
pub fn namespace_prefix(namespace: Option<&str>) -> String {
    match namespace.map(|n| n.trim_end_matches(NAME_SEPARATOR)) {
        Some(ns) if !ns.is_empty() => format!("{}{}", ns, NAME_SEPARATOR),
        _ => String::new(),
    }
}

/// Namespace used when one isn't configured explicitly: the cluster name and
/// service name joined with `.`, skipping whichever is missing.
pub fn default_namespace(cluster_name: Option<&str>, service_name: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [cluster_name, service_name]
        .iter()
        .flatten()
        .copied()
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}

pub(crate) fn non_empty(val: Option<&str>) -> Option<String> {
    val.filter(|v| !v.is_empty()).map(|v| v.to_string())
}
