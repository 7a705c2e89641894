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
//! # Role and domain registry
//!
//! Which role IDs grant access to the metrics and the domain name/ID
//! mapping. Both are loaded together into an immutable, versioned
//! [`RegistrySnapshot`]. Readers always see a complete snapshot; a reload
//! swaps the snapshot atomically.
//!
//! Reloading is governed by the [`RefreshPolicy`]:
//!
//! - `never`: the first snapshot stays until [`RoleRegistry::load`] is
//!   called explicitly,
//! - `on_reauth`: every successful service reauthentication reloads,
//! - `on_ttl`: the first access after the snapshot got older than the
//!   configured TTL reloads.

use arc_swap::ArcSwapOption;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::{Config, RefreshPolicy};
use crate::keystone::types::ProjectListParametersBuilder;
use crate::keystone::{IdentityApi, KeystoneClientError};

/// What asks for the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The service session has just (re)authenticated.
    Reauthenticated,
    /// Regular lookup.
    Access,
}

/// Immutable registry content.
#[derive(Debug)]
pub struct RegistrySnapshot {
    /// Monotonically increasing snapshot version (starting with 1).
    pub version: u64,
    pub loaded_at: Instant,
    /// Monitoring role ID to role name.
    monitoring_roles: HashMap<String, String>,
    /// Domain ID to domain name.
    domain_names: HashMap<String, String>,
    /// Domain name to domain ID.
    domain_ids: HashMap<String, String>,
}

impl RegistrySnapshot {
    pub fn is_monitoring_role(&self, role_id: &str) -> bool {
        self.monitoring_roles.contains_key(role_id)
    }

    pub fn domain_name(&self, domain_id: &str) -> Option<&str> {
        self.domain_names.get(domain_id).map(String::as_str)
    }

    pub fn domain_id(&self, domain_name: &str) -> Option<&str> {
        self.domain_ids.get(domain_name).map(String::as_str)
    }

    pub fn monitoring_role_count(&self) -> usize {
        self.monitoring_roles.len()
    }

    pub fn domain_count(&self) -> usize {
        self.domain_names.len()
    }
}

/// Holder of the current [`RegistrySnapshot`].
#[derive(Debug)]
pub struct RoleRegistry {
    /// Configured monitoring role names.
    role_names: Vec<String>,
    policy: RefreshPolicy,
    ttl: Duration,
    snapshot: ArcSwapOption<RegistrySnapshot>,
    version: AtomicU64,
    /// Serializes the loads.
    load_lock: Mutex<()>,
}

impl RoleRegistry {
    pub fn new(role_names: Vec<String>, policy: RefreshPolicy, ttl: Duration) -> Self {
        Self {
            role_names,
            policy,
            ttl,
            snapshot: ArcSwapOption::empty(),
            version: AtomicU64::new(0),
            load_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.keystone.roles.clone(),
            config.registry.refresh,
            Duration::from_secs(config.registry.ttl),
        )
    }

    /// Configured monitoring role names.
    pub fn required_roles(&self) -> &[String] {
        &self.role_names
    }

    /// Current snapshot, if any was loaded yet.
    pub fn snapshot(&self) -> Option<Arc<RegistrySnapshot>> {
        self.snapshot.load_full()
    }

    fn is_stale(&self, snapshot: &RegistrySnapshot, trigger: RefreshTrigger) -> bool {
        match self.policy {
            RefreshPolicy::Never => false,
            RefreshPolicy::OnReauth => trigger == RefreshTrigger::Reauthenticated,
            RefreshPolicy::OnTtl => snapshot.loaded_at.elapsed() >= self.ttl,
        }
    }

    /// Return the current snapshot, loading it first when there is none or
    /// the refresh policy considers it stale for the `trigger`.
    pub async fn ensure_loaded(
        &self,
        client: &dyn IdentityApi,
        token: &SecretString,
        trigger: RefreshTrigger,
    ) -> Result<Arc<RegistrySnapshot>, KeystoneClientError> {
        if let Some(snapshot) = self.snapshot.load_full()
            && !self.is_stale(&snapshot, trigger)
        {
            return Ok(snapshot);
        }
        let _guard = self.load_lock.lock().await;
        // Another caller may have loaded while we waited for the lock.
        if let Some(snapshot) = self.snapshot.load_full()
            && trigger == RefreshTrigger::Access
            && !self.is_stale(&snapshot, trigger)
        {
            return Ok(snapshot);
        }
        self.fetch(client, token).await
    }

    /// Unconditionally load a new snapshot.
    pub async fn load(
        &self,
        client: &dyn IdentityApi,
        token: &SecretString,
    ) -> Result<Arc<RegistrySnapshot>, KeystoneClientError> {
        let _guard = self.load_lock.lock().await;
        self.fetch(client, token).await
    }

    async fn fetch(
        &self,
        client: &dyn IdentityApi,
        token: &SecretString,
    ) -> Result<Arc<RegistrySnapshot>, KeystoneClientError> {
        let monitoring_roles: HashMap<String, String> = client
            .list_roles(token)
            .await?
            .into_iter()
            .filter(|role| self.role_names.contains(&role.name))
            .map(|role| (role.id, role.name))
            .collect();
        for name in &self.role_names {
            if !monitoring_roles.values().any(|x| x == name) {
                warn!("monitoring role {} does not exist", name);
            }
        }

        let domains = client
            .list_projects(
                token,
                &ProjectListParametersBuilder::default()
                    .is_domain(true)
                    .enabled(true)
                    .build()?,
            )
            .await?;
        let mut domain_names = HashMap::with_capacity(domains.len());
        let mut domain_ids = HashMap::with_capacity(domains.len());
        for domain in domains {
            domain_ids.insert(domain.name.clone(), domain.id.clone());
            domain_names.insert(domain.id, domain.name);
        }

        let snapshot = Arc::new(RegistrySnapshot {
            version: self.version.fetch_add(1, Ordering::SeqCst) + 1,
            loaded_at: Instant::now(),
            monitoring_roles,
            domain_names,
            domain_ids,
        });
        info!(
            "loaded registry version {} with {} monitoring roles and {} domains",
            snapshot.version,
            snapshot.monitoring_role_count(),
            snapshot.domain_count()
        );
        self.snapshot.store(Some(snapshot.clone()));
        Ok(snapshot)
    }
}
