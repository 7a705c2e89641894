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
//! # Service session
//!
//! The gatekeeper's own privileged connection to the identity provider,
//! used for token validation and the role, project and user lookups.
//!
//! - The connection is created lazily, under the connection lock, on first
//!   use.
//! - Logins run under the reauthentication lock. Concurrent triggers queue
//!   up and, once they get the lock, reuse a session renewed in the meantime
//!   instead of logging in again.
//! - A failed login sleeps for a random delay from an exponentially growing
//!   window while still holding the lock and clears the session. A
//!   successful one resets the backoff.
//! - The logged in state is an immutable [`SessionState`] swapped
//!   atomically, so readers never observe a half updated session.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::time;
use tracing::{debug, error, info, warn};
use url::Url;

mod backoff;
pub mod error;

pub use backoff::Backoff;
pub use error::SessionError;

use crate::config::Config;
use crate::keystone::types::*;
use crate::keystone::{IdentityApi, IdentityConnector, KeystoneClientError};
use crate::registry::{RefreshTrigger, RoleRegistry};

/// Logged in service session.
#[derive(Debug)]
pub struct SessionState {
    /// Incremented with every successful login.
    pub generation: u64,
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
    /// Service user ID.
    pub user_id: String,
    /// The gateway endpoint from the service catalog.
    pub service_url: Option<Url>,
}

impl SessionState {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Build the service user login request from the configuration.
///
/// The password is preferred; the static token is only used when no
/// password is configured.
fn service_auth_request(config: &Config) -> Result<Option<AuthRequest>, KeystoneClientError> {
    let cfg = &config.keystone;
    let user_domain = match (&cfg.user_domain_id, &cfg.user_domain_name) {
        (Some(id), _) => Some(DomainRef::with_id(id)),
        (None, Some(name)) => Some(DomainRef::with_name(name)),
        (None, None) => None,
    };
    let scope = match (&cfg.project_id, &cfg.project_name) {
        (Some(id), _) => Some(Scope::Project(ProjectRef {
            id: Some(id.clone()),
            ..Default::default()
        })),
        (None, Some(name)) => Some(Scope::Project(ProjectRef {
            name: Some(name.clone()),
            domain: match (&cfg.project_domain_id, &cfg.project_domain_name) {
                (Some(id), _) => Some(DomainRef::with_id(id)),
                (None, Some(name)) => Some(DomainRef::with_name(name)),
                (None, None) => user_domain.clone(),
            },
            ..Default::default()
        })),
        (None, None) => None,
    };

    if let Some(password) = &cfg.password
        && (cfg.user_id.is_some() || cfg.username.is_some())
    {
        let mut user = UserPasswordBuilder::default();
        user.password(password.clone());
        if let Some(id) = &cfg.user_id {
            user.id(id);
        } else if let Some(name) = &cfg.username {
            user.name(name);
            if let Some(domain) = user_domain {
                user.domain(domain);
            }
        }
        return Ok(Some(AuthRequest::password(user.build()?, scope)?));
    }
    if let Some(token) = &cfg.token {
        return Ok(Some(AuthRequest::token(token.clone(), scope)?));
    }
    Ok(None)
}

/// The service session.
pub struct ServiceSession {
    /// `None` when the service user is not configured.
    auth_request: Option<AuthRequest>,
    endpoint_opts: EndpointOpts,
    connector: Arc<dyn IdentityConnector>,
    registry: Arc<RoleRegistry>,
    /// Shared connection (the connection lock).
    connection: Mutex<Option<Arc<dyn IdentityApi>>>,
    /// Consecutive login failures (the reauthentication lock).
    backoff: Mutex<Backoff>,
    state: ArcSwapOption<SessionState>,
    generation: AtomicU64,
}

impl ServiceSession {
    pub fn new(
        config: &Config,
        connector: Arc<dyn IdentityConnector>,
        registry: Arc<RoleRegistry>,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            auth_request: service_auth_request(config)?,
            endpoint_opts: EndpointOpts::from_config(&config.keystone),
            connector,
            registry,
            connection: Mutex::new(None),
            backoff: Mutex::new(Backoff::new(config.session.max_backoff_exponent)),
            state: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
        })
    }

    /// Whether the service user credentials are configured.
    pub fn is_configured(&self) -> bool {
        self.auth_request.is_some()
    }

    /// Current session state, if logged in.
    pub fn state(&self) -> Option<Arc<SessionState>> {
        self.state.load_full()
    }

    /// The gateway endpoint from the service catalog.
    pub fn service_url(&self) -> Option<Url> {
        self.state
            .load()
            .as_ref()
            .and_then(|state| state.service_url.clone())
    }

    /// Number of consecutive failed logins.
    pub async fn consecutive_failures(&self) -> u32 {
        self.backoff.lock().await.failures()
    }

    /// Shared client, created on first use.
    async fn client(&self) -> Result<Arc<dyn IdentityApi>, SessionError> {
        let mut connection = self.connection.lock().await;
        if let Some(client) = connection.as_ref() {
            return Ok(client.clone());
        }
        debug!("creating the service connection");
        let client = self.connector.connect()?;
        *connection = Some(client.clone());
        Ok(client)
    }

    /// The shared client with a logged in (not expired) session, logging in
    /// when necessary.
    pub async fn current(
        &self,
    ) -> Result<(Arc<dyn IdentityApi>, Arc<SessionState>), SessionError> {
        let client = self.client().await?;
        let state = match self.state.load_full() {
            Some(state) if !state.is_expired() => state,
            Some(state) => {
                debug!("service token expired");
                self.reauthenticate(Some(state.generation)).await?
            }
            None => self.reauthenticate(None).await?,
        };
        Ok((client, state))
    }

    /// Log the service user in.
    ///
    /// `rejected` is the generation of the session the caller found not
    /// working. When the current session is valid and differs from it (or
    /// the caller saw no session at all), somebody else already logged in
    /// and that session is returned.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn reauthenticate(
        &self,
        rejected: Option<u64>,
    ) -> Result<Arc<SessionState>, SessionError> {
        let request = self
            .auth_request
            .as_ref()
            .ok_or(SessionError::NotConfigured)?;
        let mut backoff = self.backoff.lock().await;
        if let Some(current) = self.state.load_full()
            && !current.is_expired()
            && rejected != Some(current.generation)
        {
            debug!("service session was renewed concurrently");
            return Ok(current);
        }

        let client = self.client().await?;
        let IdentityToken { id, token } = match client.create_token(request).await {
            Ok(token) => token,
            Err(err) => {
                let delay = backoff.next_delay();
                self.state.store(None);
                warn!(
                    "service user authentication failed ({} consecutive failures), backing off for {:?}: {}",
                    backoff.failures(),
                    delay,
                    err
                );
                time::sleep(delay).await;
                return Err(SessionError::Authentication { source: err });
            }
        };
        backoff.reset();

        let service_url = match token.catalog.as_ref() {
            Some(catalog) => catalog
                .endpoint_url(&self.endpoint_opts)
                .inspect_err(|err| warn!("service endpoint unknown: {}", err))
                .ok(),
            None => {
                warn!("service token carries no catalog");
                None
            }
        };
        let state = Arc::new(SessionState {
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
            token: id,
            expires_at: token.expires_at,
            user_id: token.user.id,
            service_url,
        });
        self.state.store(Some(state.clone()));
        info!(
            "service user {} logged in (session {}, expires {})",
            state.user_id, state.generation, state.expires_at
        );

        if let Err(err) = self
            .registry
            .ensure_loaded(client.as_ref(), &state.token, RefreshTrigger::Reauthenticated)
            .await
        {
            error!("failed to load the monitoring roles and domains: {}", err);
        }
        Ok(state)
    }

    /// Run `op` with the service client and token. A rejected (401) service
    /// token triggers a single reauthentication and retry.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, SessionError>
    where
        F: Fn(Arc<dyn IdentityApi>, SecretString) -> Fut,
        Fut: Future<Output = Result<T, KeystoneClientError>>,
    {
        let (client, state) = self.current().await?;
        match op(client, state.token.clone()).await {
            Err(err) if err.is_unauthorized() => {
                debug!("service token was rejected: {}", err);
                let state = self.reauthenticate(Some(state.generation)).await?;
                let client = self.client().await?;
                Ok(op(client, state.token.clone()).await?)
            }
            result => Ok(result?),
        }
    }
}
