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

use thiserror::Error;

use crate::keystone::KeystoneClientError;
use crate::session::SessionError;

/// Project and user lookup errors.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The project hierarchy loops back to the project.
    #[error("project hierarchy cycle detected at project {project_id}")]
    HierarchyCycle { project_id: String },

    /// The project hierarchy is deeper than allowed.
    #[error("project hierarchy below {project_id} exceeds the maximum depth of {max_depth}")]
    HierarchyTooDeep { project_id: String, max_depth: usize },

    /// The domain name is not known.
    #[error("domain {0} not found")]
    UnknownDomain(String),

    #[error("no such user {name}@{domain_name}")]
    UserNotFound { name: String, domain_name: String },

    /// Identity provider call through the service session failed.
    #[error(transparent)]
    Session {
        /// The source of the error.
        #[from]
        source: SessionError,
    },
}

impl From<KeystoneClientError> for ResourceError {
    fn from(source: KeystoneClientError) -> Self {
        Self::Session {
            source: SessionError::Client { source },
        }
    }
}

impl From<crate::error::BuilderError> for ResourceError {
    fn from(source: crate::error::BuilderError) -> Self {
        KeystoneClientError::from(source).into()
    }
}
