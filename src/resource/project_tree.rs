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
//! Project hierarchy traversal.

use std::collections::HashSet;
use tracing::trace;

use super::{ResourceError, ResourceProvider};
use crate::keystone::types::ProjectListParametersBuilder;

impl ResourceProvider {
    /// Depth first traversal below the `project_id`. The children of a
    /// project directly follow it.
    pub(super) async fn fetch_child_projects(
        &self,
        project_id: &str,
    ) -> Result<Vec<String>, ResourceError> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([project_id.to_string()]);
        // (project, depth below the root)
        let mut pending = vec![(project_id.to_string(), 0usize)];

        while let Some((parent_id, depth)) = pending.pop() {
            if depth > 0 {
                result.push(parent_id.clone());
            }
            let params = ProjectListParametersBuilder::default()
                .parent_id(parent_id.as_str())
                .enabled(true)
                .build()?;
            let params = &params;
            let children = self
                .session
                .call(|client, token| async move { client.list_projects(&token, params).await })
                .await?;
            trace!("project {} has {} children", parent_id, children.len());

            if !children.is_empty() && depth >= self.max_depth {
                return Err(ResourceError::HierarchyTooDeep {
                    project_id: project_id.to_string(),
                    max_depth: self.max_depth,
                });
            }
            for child in children.into_iter().rev() {
                if !seen.insert(child.id.clone()) {
                    return Err(ResourceError::HierarchyCycle {
                        project_id: child.id,
                    });
                }
                pending.push((child.id, depth + 1));
            }
        }
        Ok(result)
    }
}
