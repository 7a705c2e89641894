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
//! Monitoring scopes and user lookup.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::{AuthorizedScope, ResourceError, ResourceProvider};
use crate::keystone::types::{RoleAssignmentListParametersBuilder, UserListParametersBuilder};
use crate::registry::{RefreshTrigger, RegistrySnapshot};

impl ResourceProvider {
    async fn registry_snapshot(&self) -> Result<Arc<RegistrySnapshot>, ResourceError> {
        let registry = &self.registry;
        Ok(self
            .session
            .call(move |client, token| async move {
                registry
                    .ensure_loaded(client.as_ref(), &token, RefreshTrigger::Access)
                    .await
            })
            .await?)
    }

    /// Projects with an effective monitoring role assignment of the user,
    /// in the assignment order without duplicates.
    pub(super) async fn fetch_user_projects(
        &self,
        user_id: &str,
    ) -> Result<Vec<AuthorizedScope>, ResourceError> {
        let snapshot = self.registry_snapshot().await?;
        let params = RoleAssignmentListParametersBuilder::default()
            .user_id(user_id)
            .effective(true)
            .build()?;
        let params = &params;
        let assignments = self
            .session
            .call(|client, token| async move { client.list_role_assignments(&token, params).await })
            .await?;

        let mut seen = HashSet::new();
        let mut scopes = Vec::new();
        for assignment in &assignments {
            if !snapshot.is_monitoring_role(&assignment.role.id) {
                continue;
            }
            let Some(project_id) = assignment.project_id() else {
                continue;
            };
            if !seen.insert(project_id) {
                continue;
            }
            let project = self
                .session
                .call(|client, token| async move { client.get_project(&token, project_id).await })
                .await?;
            scopes.push(AuthorizedScope {
                domain_name: snapshot
                    .domain_name(&project.domain_id)
                    .unwrap_or_default()
                    .to_string(),
                project_id: project.id,
                project_name: project.name,
                domain_id: project.domain_id,
            });
        }
        debug!(
            "user {} has monitoring roles on {} projects",
            user_id,
            scopes.len()
        );
        Ok(scopes)
    }

    /// First enabled user with the name in the domain.
    pub(super) async fn fetch_user_id(
        &self,
        name: &str,
        domain_name: &str,
    ) -> Result<String, ResourceError> {
        let snapshot = self.registry_snapshot().await?;
        let domain_id = snapshot
            .domain_id(domain_name)
            .ok_or_else(|| ResourceError::UnknownDomain(domain_name.to_string()))?;
        let params = UserListParametersBuilder::default()
            .name(name)
            .domain_id(domain_id)
            .enabled(true)
            .build()?;
        let params = &params;
        let users = self
            .session
            .call(|client, token| async move { client.list_users(&token, params).await })
            .await?;
        users
            .into_iter()
            .next()
            .map(|user| user.id)
            .ok_or_else(|| ResourceError::UserNotFound {
                name: name.to_string(),
                domain_name: domain_name.to_string(),
            })
    }
}
