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
//! # Identity provider client
//!
//! The subset of the Keystone v3 API the gatekeeper consumes:
//!
//! - token issue (`POST /v3/auth/tokens`) and validation (`GET
//!   /v3/auth/tokens`),
//! - project, role assignment, user and role listings (all pages drained).
//!
//! Every call that needs an authorization token receives it explicitly.
//! Client instances are independent of each other: a connection created
//! for a user login never shares state with the service session.
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

pub mod error;
pub mod http;
#[cfg(test)]
mod mock;
pub mod types;

pub use error::KeystoneClientError;
pub use http::{HttpConnector, HttpIdentityClient};
#[cfg(test)]
pub use mock::MockIdentityClient;
use types::*;

/// Identity provider API.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Issue a new token.
    async fn create_token(&self, request: &AuthRequest)
    -> Result<IdentityToken, KeystoneClientError>;

    /// Validate the `subject_token` using the `token` for authorization.
    async fn validate_token(
        &self,
        token: &SecretString,
        subject_token: &SecretString,
    ) -> Result<IdentityToken, KeystoneClientError>;

    /// List projects.
    async fn list_projects(
        &self,
        token: &SecretString,
        params: &ProjectListParameters,
    ) -> Result<Vec<Project>, KeystoneClientError>;

    /// Get a project by the `id`.
    async fn get_project<'a>(
        &self,
        token: &SecretString,
        project_id: &'a str,
    ) -> Result<Project, KeystoneClientError>;

    /// List role assignments.
    async fn list_role_assignments(
        &self,
        token: &SecretString,
        params: &RoleAssignmentListParameters,
    ) -> Result<Vec<RoleAssignment>, KeystoneClientError>;

    /// List users.
    async fn list_users(
        &self,
        token: &SecretString,
        params: &UserListParameters,
    ) -> Result<Vec<User>, KeystoneClientError>;

    /// List all roles.
    async fn list_roles(&self, token: &SecretString) -> Result<Vec<Role>, KeystoneClientError>;
}

/// Factory of independent identity provider clients.
pub trait IdentityConnector: Send + Sync {
    /// Create a new client with its own connection pool.
    fn connect(&self) -> Result<Arc<dyn IdentityApi>, KeystoneClientError>;
}

impl<F> IdentityConnector for F
where
    F: Fn() -> Result<Arc<dyn IdentityApi>, KeystoneClientError> + Send + Sync,
{
    fn connect(&self) -> Result<Arc<dyn IdentityApi>, KeystoneClientError> {
        self()
    }
}
