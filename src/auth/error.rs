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

/// Request authentication errors.
#[derive(Error, Debug)]
pub enum AuthenticationError {
    /// Neither a token nor a username/password was presented.
    #[error("{0}")]
    MissingCredentials(String),

    /// The identity provider rejected the presented token or password, or
    /// the named user does not exist.
    #[error("{0}")]
    WrongCredentials(String),

    /// The user has no monitoring role anywhere.
    #[error(
        "User {user} does not have monitoring authorization on any project in any domain (required roles: {})",
        .required_roles.join(",")
    )]
    NoPermission {
        user: String,
        required_roles: Vec<String>,
    },

    /// Identity provider unreachable or returning garbage.
    #[error("{0}")]
    NotAvailable(String),
}

impl AuthenticationError {
    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotAvailable(_))
    }
}
