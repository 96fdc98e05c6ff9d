// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::name::{default_namespace, non_empty};
use crate::types::{MetricError, MetricResult};
use crate::{DEFAULT_HOST, DEFAULT_PORT};

/// Fields that may be set in a configuration profile.
pub const CONFIG_FIELDS: [&str; 6] = [
    "service_name",
    "server_name",
    "sub_server_name",
    "cluster_name",
    "statsd_host",
    "statsd_port",
];

fn invalid_field(field: &str) -> MetricError {
    MetricError::configuration(format!(
        "Invalid config field `{}`. Allowed fields for config key: [{}].",
        field,
        CONFIG_FIELDS.join(", ")
    ))
}

/// Overrides applied on top of the top-level metrics configuration.
///
/// Every field is optional; only the fields that are set replace the values
/// they're merged over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigProfile {
    pub service_name: Option<String>,
    pub server_name: Option<String>,
    pub sub_server_name: Option<String>,
    pub cluster_name: Option<String>,
    pub statsd_host: Option<String>,
    pub statsd_port: Option<u16>,
}

impl ConfigProfile {
    /// Build a profile from key/value pairs, failing on any key that isn't
    /// one of `CONFIG_FIELDS` or a port that isn't a valid number.
    ///
    /// # Example
    ///
    /// ```
    /// use refrain::ConfigProfile;
    ///
    /// let profile = ConfigProfile::from_pairs(vec![("statsd_host", "10.0.0.8"), ("statsd_port", "8126")]).unwrap();
    /// assert_eq!(Some(8126), profile.statsd_port);
    ///
    /// let err = ConfigProfile::from_pairs(vec![("statsd_hots", "10.0.0.8")]).unwrap_err();
    /// assert!(err.to_string().contains("Allowed fields for config key"));
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> MetricResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut profile = ConfigProfile::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                "service_name" => profile.service_name = Some(value),
                "server_name" => profile.server_name = Some(value),
                "sub_server_name" => profile.sub_server_name = Some(value),
                "cluster_name" => profile.cluster_name = Some(value),
                "statsd_host" => profile.statsd_host = Some(value),
                "statsd_port" => {
                    let port = value.parse::<u16>().map_err(|_| {
                        MetricError::configuration(format!("Invalid value `{}` for config field `statsd_port`.", value))
                    })?;
                    profile.statsd_port = Some(port);
                }
                other => return Err(invalid_field(other)),
            }
        }

        Ok(profile)
    }

    fn overlay(&mut self, other: &ConfigProfile) {
        fn pick<T: Clone>(base: &mut Option<T>, over: &Option<T>) {
            if over.is_some() {
                base.clone_from(over);
            }
        }

        pick(&mut self.service_name, &other.service_name);
        pick(&mut self.server_name, &other.server_name);
        pick(&mut self.sub_server_name, &other.sub_server_name);
        pick(&mut self.cluster_name, &other.cluster_name);
        pick(&mut self.statsd_host, &other.statsd_host);
        pick(&mut self.statsd_port, &other.statsd_port);
    }
}

/// Configuration of the application emitting metrics.
///
/// Top-level values apply to every client. Named profiles override some of
/// them for particular clients, for example to send a subset of metrics to a
/// different Statsd server. Values are resolved in this order, later ones
/// winning: top-level, default profile, named profile, namespace override.
///
/// The configuration can be built with `MetricsConfig::builder()` or
/// deserialized from any format supported by `serde`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub service_name: Option<String>,
    pub server_name: Option<String>,
    pub sub_server_name: Option<String>,
    pub cluster_name: Option<String>,
    pub statsd_host: Option<String>,
    pub statsd_port: Option<u16>,
    pub profiles: BTreeMap<String, ConfigProfile>,
    pub default_profile: Option<String>,
}

impl MetricsConfig {
    pub fn builder() -> MetricsConfigBuilder {
        MetricsConfigBuilder::default()
    }

    /// Whether a service name has been configured.
    pub fn initialized(&self) -> bool {
        self.service_name.as_deref().map(|s| !s.is_empty()).unwrap_or(false)
    }

    /// The top-level service name, failing if there isn't one.
    pub fn service_name(&self) -> MetricResult<&str> {
        match self.service_name.as_deref() {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(MetricError::configuration("You must assign a value to service_name")),
        }
    }

    /// Client configuration from the top-level values merged with the
    /// default profile.
    pub fn default_client_config(&self) -> MetricResult<ClientConfig> {
        self.client_config(None, None)
    }

    /// Client configuration for a named profile and optional namespace.
    ///
    /// Profiles that don't exist are treated as empty. When `profile` is
    /// `None` only the default profile is applied.
    pub fn client_config(&self, profile: Option<&str>, namespace: Option<&str>) -> MetricResult<ClientConfig> {
        let mut fields = self.top_level();

        if let Some(p) = self.default_profile.as_deref().and_then(|name| self.profiles.get(name)) {
            fields.overlay(p);
        }

        if let Some(p) = profile.and_then(|name| self.profiles.get(name)) {
            fields.overlay(p);
        }

        let service_name = match non_empty(fields.service_name.as_deref()) {
            Some(name) => name,
            None => return Err(MetricError::configuration("You must assign a value to service_name")),
        };

        Ok(ClientConfig {
            host: fields.statsd_host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: fields.statsd_port.unwrap_or(DEFAULT_PORT),
            cluster_name: fields.cluster_name,
            service_name: Some(service_name),
            server_label: fields.server_name,
            sub_server_name: fields.sub_server_name,
            namespace: namespace.map(|n| n.to_string()),
        })
    }

    fn top_level(&self) -> ConfigProfile {
        ConfigProfile {
            service_name: self.service_name.clone(),
            server_name: self.server_name.clone(),
            sub_server_name: self.sub_server_name.clone(),
            cluster_name: self.cluster_name.clone(),
            statsd_host: self.statsd_host.clone(),
            statsd_port: self.statsd_port,
        }
    }
}

/// Builder for `MetricsConfig` instances.
#[derive(Debug, Clone, Default)]
pub struct MetricsConfigBuilder {
    config: MetricsConfig,
}

impl MetricsConfigBuilder {
    pub fn service_name(mut self, name: &str) -> Self {
        self.config.service_name = Some(name.to_string());
        self
    }

    pub fn server_name(mut self, name: &str) -> Self {
        self.config.server_name = Some(name.to_string());
        self
    }

    pub fn sub_server_name(mut self, name: &str) -> Self {
        self.config.sub_server_name = Some(name.to_string());
        self
    }

    pub fn cluster_name(mut self, name: &str) -> Self {
        self.config.cluster_name = Some(name.to_string());
        self
    }

    pub fn statsd_host(mut self, host: &str) -> Self {
        self.config.statsd_host = Some(host.to_string());
        self
    }

    pub fn statsd_port(mut self, port: u16) -> Self {
        self.config.statsd_port = Some(port);
        self
    }

    pub fn profile(mut self, name: &str, profile: ConfigProfile) -> Self {
        self.config.profiles.insert(name.to_string(), profile);
        self
    }

    /// Add a profile from key/value pairs, see `ConfigProfile::from_pairs`.
    pub fn profile_pairs<I, K, V>(self, name: &str, pairs: I) -> MetricResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let profile = ConfigProfile::from_pairs(pairs)?;
        Ok(self.profile(name, profile))
    }

    pub fn default_profile(mut self, name: &str) -> Self {
        self.config.default_profile = Some(name.to_string());
        self
    }

    /// Build the configuration, failing if no service name was given.
    pub fn build(self) -> MetricResult<MetricsConfig> {
        self.config.service_name()?;
        Ok(self.config)
    }
}

/// Fully resolved settings of a single metrics client.
///
/// Two equal configurations always map to the same client in a
/// `MetricsRegistry`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub cluster_name: Option<String>,
    pub service_name: Option<String>,
    pub server_label: Option<String>,
    pub sub_server_name: Option<String>,
    pub namespace: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cluster_name: None,
            service_name: None,
            server_label: None,
            sub_server_name: None,
            namespace: None,
        }
    }
}

impl ClientConfig {
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_cluster_name(mut self, name: &str) -> Self {
        self.cluster_name = Some(name.to_string());
        self
    }

    pub fn with_service_name(mut self, name: &str) -> Self {
        self.service_name = Some(name.to_string());
        self
    }

    pub fn with_server_label(mut self, label: &str) -> Self {
        self.server_label = Some(label.to_string());
        self
    }

    pub fn with_sub_server_name(mut self, name: &str) -> Self {
        self.sub_server_name = Some(name.to_string());
        self
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Namespace prepended to every metric name: the configured namespace if
    /// there is one, otherwise the cluster and service names joined with `.`.
    pub fn effective_namespace(&self) -> Option<String> {
        match non_empty(self.namespace.as_deref()) {
            Some(ns) => Some(ns),
            None => default_namespace(self.cluster_name.as_deref(), self.service_name.as_deref()),
        }
    }
}
