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
//! # Authorization context
//!
//! The flattened view of a verified token handed to the policy engine and
//! used for the identity header injection.

use chrono::SecondsFormat;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::auth::truncate_token;
use crate::keystone::types::IdentityToken;

pub const USER_ID: &str = "user_id";
pub const USER_NAME: &str = "user_name";
pub const USER_DOMAIN_ID: &str = "user_domain_id";
pub const USER_DOMAIN_NAME: &str = "user_domain_name";
pub const DOMAIN_ID: &str = "domain_id";
pub const DOMAIN_NAME: &str = "domain_name";
pub const PROJECT_ID: &str = "project_id";
pub const PROJECT_NAME: &str = "project_name";
pub const PROJECT_DOMAIN_ID: &str = "project_domain_id";
pub const PROJECT_DOMAIN_NAME: &str = "project_domain_name";
pub const TOKEN: &str = "token";
pub const TOKEN_EXPIRY: &str = "token-expiry";

/// Authorization context of an authenticated request.
#[derive(Clone, Default, Deserialize, PartialEq, Serialize)]
pub struct AuthorizationContext {
    /// Identity and scope attributes. Attributes with empty values are
    /// omitted.
    pub auth: BTreeMap<String, String>,

    /// Names of the roles on the scope.
    pub roles: Vec<String>,

    /// User, domain and project IDs (possibly empty).
    pub request: BTreeMap<String, String>,
}

impl AuthorizationContext {
    /// Auth attribute by its key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.auth.get(key).map(String::as_str)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get(USER_ID)
    }

    pub fn project_id(&self) -> Option<&str> {
        self.get(PROJECT_ID)
    }

    pub fn domain_id(&self) -> Option<&str> {
        self.get(DOMAIN_ID)
    }
}

impl From<&IdentityToken> for AuthorizationContext {
    fn from(value: &IdentityToken) -> Self {
        let token = &value.token;
        let (domain_id, domain_name) = token
            .domain
            .as_ref()
            .map(|domain| (domain.id.as_str(), domain.name.as_str()))
            .unwrap_or_default();
        let (project_id, project_name, project_domain_id, project_domain_name) = token
            .project
            .as_ref()
            .map(|project| {
                (
                    project.id.as_str(),
                    project.name.as_str(),
                    project.domain.id.as_str(),
                    project.domain.name.as_str(),
                )
            })
            .unwrap_or_default();
        let expiry = token
            .expires_at
            .to_rfc3339_opts(SecondsFormat::Micros, true);

        let auth = [
            (USER_ID, token.user.id.as_str()),
            (USER_NAME, token.user.name.as_str()),
            (USER_DOMAIN_ID, token.user.domain.id.as_str()),
            (USER_DOMAIN_NAME, token.user.domain.name.as_str()),
            (DOMAIN_ID, domain_id),
            (DOMAIN_NAME, domain_name),
            (PROJECT_ID, project_id),
            (PROJECT_NAME, project_name),
            (PROJECT_DOMAIN_ID, project_domain_id),
            (PROJECT_DOMAIN_NAME, project_domain_name),
            (TOKEN, value.id.expose_secret()),
            (TOKEN_EXPIRY, expiry.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

        let request = [
            (USER_ID, token.user.id.as_str()),
            (DOMAIN_ID, domain_id),
            (PROJECT_ID, project_id),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

        Self {
            auth,
            roles: token.roles.iter().map(|role| role.name.clone()).collect(),
            request,
        }
    }
}

impl fmt::Debug for AuthorizationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth: BTreeMap<&str, &str> = self
            .auth
            .iter()
            .map(|(key, value)| {
                if key == TOKEN {
                    (key.as_str(), truncate_token(value))
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("AuthorizationContext")
            .field("auth", &auth)
            .field("roles", &self.roles)
            .field("request", &self.request)
            .finish()
    }
}
