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

use axum::http::request::Parts;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::credentials::{ExtractedCredentials, extract_credentials};
use crate::auth::error::AuthenticationError;
use crate::auth::headers::inject_identity_headers;
use crate::auth::truncate_token;
use crate::auth::types::{Authentication, CredentialRequest, Credentials};
use crate::gatekeeper::Gatekeeper;
use crate::keystone::types::{CatalogError, IdentityToken};
use crate::policy::AuthorizationContext;

impl Gatekeeper {
    /// Authenticate the request and set the identity headers on it.
    ///
    /// With `guess_scope` a basic authentication without any scope is
    /// scoped to the first project on which the user holds a monitoring
    /// role.
    #[tracing::instrument(level = "debug", skip_all, fields(uri = %parts.uri))]
    pub async fn authenticate_request(
        &self,
        parts: &mut Parts,
        guess_scope: bool,
    ) -> Result<Arc<Authentication>, AuthenticationError> {
        let ExtractedCredentials {
            mut request,
            guess_allowed,
        } = extract_credentials(parts).inspect_err(|err| info!("{}", err))?;

        if guess_scope
            && guess_allowed
            && let Credentials::Password { user, .. } = &request.credentials
        {
            request.scope = self
                .guess_scope(user)
                .await
                .inspect_err(|err| info!("{}", err))?;
        }

        let auth = self.authenticate_credentials(&request, true).await?;
        inject_identity_headers(&mut parts.headers, &auth);
        Ok(auth)
    }

    /// Authenticate the credentials by issuing a new token.
    pub async fn authenticate(
        &self,
        request: &CredentialRequest,
    ) -> Result<Arc<Authentication>, AuthenticationError> {
        self.authenticate_credentials(request, false).await
    }

    /// With `verify` an unscoped token is validated with the service
    /// session instead of being exchanged.
    async fn authenticate_credentials(
        &self,
        request: &CredentialRequest,
        verify: bool,
    ) -> Result<Arc<Authentication>, AuthenticationError> {
        let key = request.cache_key();
        if let Some(auth) = self.caches.contexts.get(&key) {
            if !auth.token.is_expired() {
                debug!("Token cache hit for {:?}", key);
                return Ok(auth);
            }
            debug!("cached token of {:?} has expired", key);
            self.caches.contexts.remove(&key);
        }

        let token = match &request.credentials {
            Credentials::Token(token)
                if verify && request.scope.is_unscoped() && self.session.is_configured() =>
            {
                self.verify_token(token).await?
            }
            _ => self.issue_token(request).await?,
        };

        let endpoint = token
            .token
            .catalog
            .as_ref()
            .ok_or(CatalogError::CatalogMissing)
            .and_then(|catalog| catalog.endpoint_url(&self.endpoint_opts))
            .map_err(|err| AuthenticationError::NotAvailable(err.to_string()))?;
        let auth = Arc::new(Authentication {
            context: AuthorizationContext::from(&token),
            token,
            endpoint,
        });
        self.caches.contexts.insert(key, auth.clone());
        Ok(auth)
    }

    /// Validate the token with the service session.
    async fn verify_token(&self, token: &SecretString) -> Result<IdentityToken, AuthenticationError> {
        debug!("verify token {}...", truncate_token(token.expose_secret()));
        self.session
            .call(|client, service_token| async move {
                client.validate_token(&service_token, token).await
            })
            .await
            .map_err(|err| match err.client_error() {
                // a 401 survived the service reauthentication
                Some(source) if source.is_rejection() && !source.is_unauthorized() => {
                    AuthenticationError::WrongCredentials(source.to_string())
                }
                _ => AuthenticationError::NotAvailable(err.to_string()),
            })
    }

    /// Exchange the credentials for a new token using a fresh client.
    async fn issue_token(
        &self,
        request: &CredentialRequest,
    ) -> Result<IdentityToken, AuthenticationError> {
        let auth_request = request
            .to_auth_request()
            .map_err(|err| AuthenticationError::MissingCredentials(err.to_string()))?;
        let client = self
            .connector
            .connect()
            .map_err(|err| AuthenticationError::NotAvailable(err.to_string()))?;
        match &request.credentials {
            Credentials::Password { user, .. } => {
                debug!("authenticate {} with scope {}", user, request.scope)
            }
            Credentials::Token(_) => debug!("exchange token with scope {}", request.scope),
        }

        client.create_token(&auth_request).await.map_err(|err| {
            if !err.is_rejection() {
                return AuthenticationError::NotAvailable(err.to_string());
            }
            if !request.has_identity() {
                return AuthenticationError::MissingCredentials(err.to_string());
            }
            match &request.credentials {
                Credentials::Password { user, .. } => info!(
                    "Failed login of user {} for scope {}: {}",
                    user, request.scope, err
                ),
                Credentials::Token(token) => info!(
                    "Failed login with token {}... for scope {}: {}",
                    truncate_token(token.expose_secret()),
                    request.scope,
                    err
                ),
            }
            AuthenticationError::WrongCredentials(err.to_string())
        })
    }
}
