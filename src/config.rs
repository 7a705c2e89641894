// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0
//! # Gatekeeper configuration
//!
//! The configuration is read from an (optional) file and overlaid with
//! `GATEKEEPER__<SECTION>__<KEY>` environment variables.
use config::{ConfigError, Environment, File, FileFormat};
use eyre::{Report, WrapErr};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    /// Global configuration options
    #[serde(rename = "DEFAULT", default)]
    pub default: DefaultSection,

    /// Identity provider connection and service account.
    #[serde(default)]
    pub keystone: KeystoneSection,

    /// Cache maintenance.
    #[serde(default)]
    pub cache: CacheSection,

    /// Role and domain registry.
    #[serde(default)]
    pub registry: RegistrySection,

    /// Service session.
    #[serde(default)]
    pub session: SessionSection,

    /// Project hierarchy resolution.
    #[serde(default)]
    pub resource: ResourceSection,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct DefaultSection {
    /// Debug logging
    pub debug: Option<bool>,
    /// Outbound proxy for all identity provider connections.
    #[serde(default, deserialize_with = "optional_url")]
    pub proxy: Option<Url>,
}

/// Identity provider configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct KeystoneSection {
    /// Keystone endpoint (with or without the `/v3` suffix).
    #[serde(default, deserialize_with = "optional_url")]
    pub auth_url: Option<Url>,

    /// Service user name.
    #[serde(default, deserialize_with = "optional_string")]
    pub username: Option<String>,

    /// Service user ID (alternative to the `username`).
    #[serde(default, deserialize_with = "optional_string")]
    pub user_id: Option<String>,

    /// Service user password.
    #[serde(default, deserialize_with = "optional_secret")]
    pub password: Option<SecretString>,

    #[serde(default, deserialize_with = "optional_string")]
    pub user_domain_name: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub user_domain_id: Option<String>,

    /// Static service token. Only used when no password is configured.
    #[serde(default, deserialize_with = "optional_secret")]
    pub token: Option<SecretString>,

    #[serde(default, deserialize_with = "optional_string")]
    pub project_name: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub project_id: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub project_domain_name: Option<String>,

    #[serde(default, deserialize_with = "optional_string")]
    pub project_domain_id: Option<String>,

    /// Role names granting access to the metrics (comma separated).
    #[serde(default, deserialize_with = "csv")]
    pub roles: Vec<String>,

    /// Lifetime of the cached authentication results, project trees and
    /// user scopes (in seconds).
    #[serde(default = "default_token_cache_time")]
    pub token_cache_time: u64,

    /// Catalog region of the gateway endpoint.
    #[serde(default, deserialize_with = "optional_string")]
    pub region: Option<String>,

    /// Catalog service type of the gateway endpoint.
    #[serde(default = "default_service_type")]
    pub service_type: String,

    /// Catalog interface of the gateway endpoint.
    #[serde(default = "default_interface")]
    pub interface: String,
}

impl Default for KeystoneSection {
    fn default() -> Self {
        Self {
            auth_url: None,
            username: None,
            user_id: None,
            password: None,
            user_domain_name: None,
            user_domain_id: None,
            token: None,
            project_name: None,
            project_id: None,
            project_domain_name: None,
            project_domain_id: None,
            roles: Vec::new(),
            token_cache_time: default_token_cache_time(),
            region: None,
            service_type: default_service_type(),
            interface: default_interface(),
        }
    }
}

impl KeystoneSection {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.token_cache_time)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSection {
    /// Interval (in seconds) of the expired cache entries sweep.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl CacheSection {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }
}

/// When the monitoring role and domain registry is reloaded.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Load once, refresh only on explicit request.
    #[default]
    Never,
    /// Reload after every successful service reauthentication.
    OnReauth,
    /// Reload on access once the snapshot is older than the `ttl`.
    OnTtl,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistrySection {
    #[serde(default)]
    pub refresh: RefreshPolicy,

    /// Maximum snapshot age (in seconds) for the `on_ttl` policy.
    #[serde(default = "default_registry_ttl")]
    pub ttl: u64,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            refresh: RefreshPolicy::default(),
            ttl: default_registry_ttl(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSection {
    /// Upper bound of the backoff exponent: the jitter window never
    /// exceeds `2^max_backoff_exponent` seconds.
    #[serde(default = "default_max_backoff_exponent")]
    pub max_backoff_exponent: u32,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            max_backoff_exponent: default_max_backoff_exponent(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResourceSection {
    /// Maximum depth of the project hierarchy below a single project.
    #[serde(default = "default_max_project_depth")]
    pub max_project_depth: usize,
}

impl Default for ResourceSection {
    fn default() -> Self {
        Self {
            max_project_depth: default_max_project_depth(),
        }
    }
}

pub fn csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(String::deserialize(deserializer)?
        .split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(Into::into)
        .collect())
}

/// Empty INI values (`key =`) are treated as absent.
fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|x| !x.trim().is_empty()))
}

fn optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_string(deserializer)?.map(SecretString::from))
}

fn optional_url<'de, D>(deserializer: D) -> Result<Option<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_string(deserializer)?
        .map(|x| Url::parse(&x).map_err(serde::de::Error::custom))
        .transpose()
}

fn default_token_cache_time() -> u64 {
    900
}

fn default_service_type() -> String {
    "metrics".into()
}

fn default_interface() -> String {
    "public".into()
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_registry_ttl() -> u64 {
    3600
}

fn default_max_backoff_exponent() -> u32 {
    8
}

fn default_max_project_depth() -> usize {
    32
}

impl Config {
    pub fn new(path: PathBuf) -> Result<Self, Report> {
        Self::load(path, environment())
    }

    fn load(path: PathBuf, environment: Environment) -> Result<Self, Report> {
        let mut builder = config::Config::builder();

        if path.is_file() {
            let format = match path.extension().and_then(|x| x.to_str()) {
                Some("toml") => FileFormat::Toml,
                Some("yaml" | "yml") => FileFormat::Yaml,
                Some("json") => FileFormat::Json,
                _ => FileFormat::Ini,
            };
            builder = builder.add_source(File::from(path).format(format));
        }
        builder.add_source(environment).try_into()
    }
}

/// `GATEKEEPER__<SECTION>__<KEY>` variables. Keys arrive lower cased.
fn environment() -> Environment {
    Environment::with_prefix("GATEKEEPER")
        .prefix_separator("__")
        .separator("__")
}

impl DefaultSection {
    fn merge(&mut self, overrides: DefaultSection) {
        if overrides.debug.is_some() {
            self.debug = overrides.debug;
        }
        if overrides.proxy.is_some() {
            self.proxy = overrides.proxy;
        }
    }
}

impl TryFrom<config::ConfigBuilder<config::builder::DefaultState>> for Config {
    type Error = Report;
    fn try_from(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, Self::Error> {
        let mut builder = builder;
        builder = builder
            .set_default("keystone.token_cache_time", "900")?
            .set_default("keystone.service_type", "metrics")?
            .set_default("keystone.interface", "public")?
            .set_default("cache.sweep_interval", "60")?
            .set_default("registry.refresh", "never")?
            .set_default("registry.ttl", "3600")?
            .set_default("session.max_backoff_exponent", "8")?
            .set_default("resource.max_project_depth", "32")?;

        let settings = builder
            .build()
            .wrap_err("Failed to read configuration file")?;
        // `[DEFAULT]` from the environment lands in the lower case section
        let overrides = match settings.get::<DefaultSection>("default") {
            Ok(overrides) => Some(overrides),
            Err(ConfigError::NotFound(_)) => None,
            Err(err) => return Err(err).wrap_err("Failed to parse the DEFAULT overrides"),
        };
        let mut config: Config = settings
            .try_deserialize()
            .wrap_err("Failed to parse configuration file")?;
        if let Some(overrides) = overrides {
            config.default.merge(overrides);
        }
        Ok(config)
    }
}
