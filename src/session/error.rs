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

/// Service session error.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Neither a password nor a static token is configured for the
    /// service user.
    #[error("service user credentials are not configured")]
    NotConfigured,

    /// The service user could not log in.
    #[error("service user authentication failed: {source}")]
    Authentication {
        /// The source of the error.
        source: KeystoneClientError,
    },

    /// A call performed with the service token failed.
    #[error(transparent)]
    Client {
        #[from]
        source: KeystoneClientError,
    },
}

impl SessionError {
    /// Error of the call itself (not of the service session).
    pub fn client_error(&self) -> Option<&KeystoneClientError> {
        match self {
            Self::Client { source } => Some(source),
            _ => None,
        }
    }
}
