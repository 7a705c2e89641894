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
//! Roles and role assignments.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::BuilderError;

/// The role.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Role {
    /// The role ID.
    pub id: String,
    /// The role name.
    pub name: String,
    /// Domain of a domain specific role.
    #[serde(default)]
    pub domain_id: Option<String>,
}

/// Reference to an object by its ID.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct IdRef {
    pub id: String,
}

/// Target of the assignment.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AssignmentScope {
    #[serde(default)]
    pub project: Option<IdRef>,
    #[serde(default)]
    pub domain: Option<IdRef>,
}

/// The role assignment.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RoleAssignment {
    pub role: IdRef,
    #[serde(default)]
    pub user: Option<IdRef>,
    #[serde(default)]
    pub group: Option<IdRef>,
    #[serde(default)]
    pub scope: AssignmentScope,
}

impl RoleAssignment {
    /// Project of a project level assignment.
    pub fn project_id(&self) -> Option<&str> {
        self.scope.project.as_ref().map(|x| x.id.as_str())
    }
}

/// Role assignment listing filters.
#[derive(Builder, Clone, Debug, Default, PartialEq, Serialize)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(strip_option, into))]
pub struct RoleAssignmentListParameters {
    /// Query role assignments of the user.
    #[builder(default)]
    #[serde(rename = "user.id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Resolve group memberships and inherited assignments.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective: Option<bool>,
}
