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

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::BuilderError;

#[derive(Builder, Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(strip_option, into))]
pub struct Project {
    /// The project ID.
    pub id: String,

    /// The project name.
    #[builder(default)]
    #[serde(default)]
    pub name: String,

    /// The project domain_id.
    #[builder(default)]
    #[serde(default)]
    pub domain_id: String,

    /// If set to true, project is enabled. If set to false, project is
    /// disabled.
    #[builder(default = "true")]
    #[serde(default)]
    pub enabled: bool,

    /// Indicates whether the project also acts as a domain.
    #[builder(default)]
    #[serde(default)]
    pub is_domain: bool,

    /// The ID of the parent for the project.
    #[builder(default)]
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Project listing filters.
#[derive(Builder, Clone, Debug, Default, PartialEq, Serialize)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(strip_option, into))]
pub struct ProjectListParameters {
    /// Filter projects by the parent project.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Filter projects acting as domains.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_domain: Option<bool>,

    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}
