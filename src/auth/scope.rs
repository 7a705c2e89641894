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
//! Scope guessing.

use tracing::debug;

use crate::auth::error::AuthenticationError;
use crate::auth::types::{ScopeRequest, UserRef};
use crate::gatekeeper::Gatekeeper;
use crate::resource::ResourceError;

impl Gatekeeper {
    /// Pick the first project on which the user holds a monitoring role.
    #[tracing::instrument(level = "debug", skip(self))]
    pub(crate) async fn guess_scope(
        &self,
        user: &UserRef,
    ) -> Result<ScopeRequest, AuthenticationError> {
        let (user_id, label) = match user {
            UserRef::Id(id) => (id.clone(), id.clone()),
            UserRef::Name { name, domain_name } => {
                let user_id = self
                    .resources
                    .user_id(name, domain_name)
                    .await
                    .map_err(|err| match err {
                        ResourceError::Session { .. } => {
                            AuthenticationError::NotAvailable(err.to_string())
                        }
                        _ => AuthenticationError::WrongCredentials(err.to_string()),
                    })?;
                let label = format!("{user_id} ({user})");
                (user_id, label)
            }
        };

        let projects = self
            .resources
            .user_projects(&user_id)
            .await
            .map_err(|err| AuthenticationError::NotAvailable(err.to_string()))?;
        let Some(first) = projects.into_iter().next() else {
            return Err(AuthenticationError::NoPermission {
                user: label,
                required_roles: self.required_roles().to_vec(),
            });
        };
        debug!(
            "guessed project {} ({}) for user {}",
            first.project_id, first.project_name, label
        );
        if first.project_id.is_empty() {
            Ok(ScopeRequest::DomainId(first.domain_id))
        } else {
            Ok(ScopeRequest::ProjectId(first.project_id))
        }
    }
}
