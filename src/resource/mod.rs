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
//! # Resource provider
//!
//! Project hierarchy and user lookups performed with the service session.
//!
//! ## Project tree
//!
//! All enabled projects below a project, parents before their children.
//!
//! ## User projects
//!
//! Projects on which the user holds (directly, through a group or
//! inherited) one of the monitoring roles.
//!
//! ## User ID
//!
//! ID of the enabled user with the name in the domain.
//!
//! All results are cached. User IDs never expire, the rest ages out with
//! the cache TTL.
use async_trait::async_trait;
use std::sync::Arc;

pub mod error;
#[cfg(test)]
mod mock;
mod project_tree;
pub mod types;
mod user_projects;

use crate::cache::{AuthCaches, UserNameKey};
use crate::config::Config;
use crate::registry::RoleRegistry;
use crate::session::ServiceSession;

pub use error::ResourceError;
#[cfg(test)]
pub use mock::MockResourceProvider;
pub use types::AuthorizedScope;

/// Project and user lookups.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// IDs of all enabled descendants of the project.
    async fn child_projects<'a>(&self, project_id: &'a str) -> Result<Vec<String>, ResourceError>;

    /// Projects on which the user holds a monitoring role.
    async fn user_projects<'a>(
        &self,
        user_id: &'a str,
    ) -> Result<Vec<AuthorizedScope>, ResourceError>;

    /// ID of the user by the name and the domain name.
    async fn user_id<'a>(&self, name: &'a str, domain_name: &'a str)
    -> Result<String, ResourceError>;
}

/// Cached lookups using the service session.
pub struct ResourceProvider {
    session: Arc<ServiceSession>,
    registry: Arc<RoleRegistry>,
    caches: Arc<AuthCaches>,
    max_depth: usize,
}

impl ResourceProvider {
    pub fn new(
        config: &Config,
        session: Arc<ServiceSession>,
        registry: Arc<RoleRegistry>,
        caches: Arc<AuthCaches>,
    ) -> Self {
        Self {
            session,
            registry,
            caches,
            max_depth: config.resource.max_project_depth,
        }
    }
}

#[async_trait]
impl ResourceApi for ResourceProvider {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn child_projects<'a>(&self, project_id: &'a str) -> Result<Vec<String>, ResourceError> {
        if let Some(children) = self.caches.project_trees.get(&project_id.to_string()) {
            return Ok(children.as_ref().clone());
        }
        let children = self
            .fetch_child_projects(project_id)
            .await
            .inspect_err(|err| {
                tracing::error!(
                    "Unable to obtain project tree of project {}: {}",
                    project_id,
                    err
                )
            })?;
        self.caches
            .project_trees
            .insert(project_id.to_string(), Arc::new(children.clone()));
        Ok(children)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn user_projects<'a>(
        &self,
        user_id: &'a str,
    ) -> Result<Vec<AuthorizedScope>, ResourceError> {
        if let Some(scopes) = self.caches.user_projects.get(&user_id.to_string()) {
            return Ok(scopes.as_ref().clone());
        }
        let scopes = self.fetch_user_projects(user_id).await.inspect_err(|err| {
            tracing::error!(
                "Unable to obtain monitoring project list of user {}: {}",
                user_id,
                err
            )
        })?;
        self.caches
            .user_projects
            .insert(user_id.to_string(), Arc::new(scopes.clone()));
        Ok(scopes)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn user_id<'a>(
        &self,
        name: &'a str,
        domain_name: &'a str,
    ) -> Result<String, ResourceError> {
        let key = UserNameKey {
            name: name.to_string(),
            domain_name: domain_name.to_string(),
        };
        if let Some(id) = self.caches.user_ids.get(&key) {
            return Ok(id);
        }
        let id = self.fetch_user_id(name, domain_name).await?;
        self.caches.user_ids.insert(key, id.clone());
        Ok(id)
    }
}
