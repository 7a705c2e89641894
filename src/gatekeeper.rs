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
//! # Gatekeeper
//!
//! The engine object tying the configuration, the identity provider
//! connector, the service session, the role registry, the resource lookups
//! and the caches together. Request authentication lives in
//! [`crate::auth`].

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;

use crate::auth::AuthenticationError;
use crate::cache::{AuthCaches, spawn_sweeper};
use crate::config::Config;
use crate::error::GatekeeperError;
use crate::keystone::types::EndpointOpts;
use crate::keystone::{HttpConnector, IdentityConnector};
use crate::registry::{RegistrySnapshot, RoleRegistry};
use crate::resource::{AuthorizedScope, ResourceApi, ResourceError, ResourceProvider};
use crate::session::ServiceSession;

pub struct Gatekeeper {
    /// Config file
    pub config: Config,
    /// Factory of the user path clients.
    pub(crate) connector: Arc<dyn IdentityConnector>,
    pub(crate) session: Arc<ServiceSession>,
    pub(crate) registry: Arc<RoleRegistry>,
    pub(crate) resources: Arc<dyn ResourceApi>,
    pub(crate) caches: Arc<AuthCaches>,
    /// Selection of the metrics endpoint in the user token catalogs.
    pub(crate) endpoint_opts: EndpointOpts,
    shutdown: CancellationToken,
}

pub type GatekeeperState = Arc<Gatekeeper>;

impl Gatekeeper {
    pub fn new(
        config: Config,
        connector: Arc<dyn IdentityConnector>,
    ) -> Result<Self, GatekeeperError> {
        let registry = Arc::new(RoleRegistry::from_config(&config));
        let session = Arc::new(ServiceSession::new(
            &config,
            connector.clone(),
            registry.clone(),
        )?);
        let caches = Arc::new(AuthCaches::new(config.keystone.cache_ttl()));
        let resources = Arc::new(ResourceProvider::new(
            &config,
            session.clone(),
            registry.clone(),
            caches.clone(),
        ));
        Ok(Self {
            endpoint_opts: EndpointOpts::from_config(&config.keystone),
            config,
            connector,
            session,
            registry,
            resources,
            caches,
            shutdown: CancellationToken::new(),
        })
    }

    /// Gatekeeper talking to the configured Keystone over HTTP.
    pub fn from_config(config: Config) -> Result<Self, GatekeeperError> {
        let connector = Arc::new(HttpConnector::from_config(&config)?);
        Self::new(config, connector)
    }

    /// Replace the project and user lookups.
    pub fn with_resources(mut self, resources: Arc<dyn ResourceApi>) -> Self {
        self.resources = resources;
        self
    }

    /// Log the service user in (when configured) and start the periodic
    /// cache sweep.
    ///
    /// A failed service logon is not fatal: the session retries on the
    /// next use.
    pub async fn start(&self) -> JoinHandle<()> {
        if self.session.is_configured() {
            match self.session.current().await {
                Ok((_, state)) => {
                    if state.service_url.is_none() {
                        warn!("the gateway endpoint is missing in the service catalog");
                    }
                }
                Err(err) => error!("initial service user logon failed: {}", err),
            }
        } else {
            warn!("service user credentials are not configured, tokens are validated by reissuing");
        }
        spawn_sweeper(
            self.caches.clone(),
            self.config.cache.sweep_interval(),
            self.shutdown.clone(),
        )
    }

    pub fn terminate(&self) {
        info!("Terminating the gatekeeper");
        self.shutdown.cancel();
    }

    /// IDs of all enabled projects below the project.
    pub async fn child_projects(&self, project_id: &str) -> Result<Vec<String>, ResourceError> {
        self.resources.child_projects(project_id).await
    }

    /// Projects on which the user holds a monitoring role.
    pub async fn user_projects(&self, user_id: &str) -> Result<Vec<AuthorizedScope>, ResourceError> {
        self.resources.user_projects(user_id).await
    }

    pub async fn user_id(&self, name: &str, domain_name: &str) -> Result<String, ResourceError> {
        self.resources.user_id(name, domain_name).await
    }

    /// The gateway's own endpoint from the service catalog, logging the
    /// service user in when necessary.
    pub async fn service_url(&self) -> Result<Url, AuthenticationError> {
        let (_, state) = self
            .session
            .current()
            .await
            .map_err(|err| AuthenticationError::NotAvailable(err.to_string()))?;
        state.service_url.clone().ok_or_else(|| {
            AuthenticationError::NotAvailable(format!(
                "no {} endpoint of the {} service in the service catalog",
                self.endpoint_opts.interface, self.endpoint_opts.service_type
            ))
        })
    }

    /// Reload the monitoring roles and the domains regardless of the
    /// refresh policy.
    pub async fn refresh_registry(&self) -> Result<Arc<RegistrySnapshot>, GatekeeperError> {
        let registry = &self.registry;
        Ok(self
            .session
            .call(move |client, token| async move { registry.load(client.as_ref(), &token).await })
            .await?)
    }

    /// Current registry snapshot.
    pub fn registry_snapshot(&self) -> Option<Arc<RegistrySnapshot>> {
        self.registry.snapshot()
    }

    /// Monitoring role names.
    pub fn required_roles(&self) -> &[String] {
        self.registry.required_roles()
    }
}
