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
//! Token payload as returned by `POST` and `GET /v3/auth/tokens`.

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::BuilderError;
use crate::keystone::types::catalog::Catalog;

/// Response envelope.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    pub token: Token,
}

/// Token payload.
#[derive(Builder, Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(strip_option, into))]
pub struct Token {
    /// Authentication methods used to obtain the token.
    #[builder(default)]
    #[serde(default)]
    pub methods: Vec<String>,

    /// User the token was issued to.
    pub user: TokenUser,

    /// Project scope.
    #[builder(default)]
    #[serde(default)]
    pub project: Option<TokenProject>,

    /// Domain scope.
    #[builder(default)]
    #[serde(default)]
    pub domain: Option<DomainInfo>,

    /// Roles assigned on the scope.
    #[builder(default)]
    #[serde(default)]
    pub roles: Vec<TokenRole>,

    pub expires_at: DateTime<Utc>,

    #[builder(default)]
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,

    /// Service catalog (missing for `nocatalog` requests).
    #[builder(default)]
    #[serde(default)]
    pub catalog: Option<Catalog>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TokenUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: DomainInfo,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TokenProject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: DomainInfo,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DomainInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TokenRole {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Verified token: the opaque token string and its payload.
#[derive(Clone, Debug)]
pub struct IdentityToken {
    /// Token as presented in the `X-Auth-Token` header.
    pub id: SecretString,
    pub token: Token,
}

impl IdentityToken {
    pub fn is_expired(&self) -> bool {
        self.token.expires_at <= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize_project_token() {
        let token: TokenResponse = serde_json::from_value(json!({"token": {
            "methods": ["password"],
            "user": {"id": "uid", "name": "alice", "domain": {"id": "did", "name": "Default"}},
            "project": {"id": "p1", "name": "proj", "domain": {"id": "did", "name": "Default"}},
            "roles": [{"id": "rid", "name": "monitoring_viewer"}],
            "expires_at": "2030-08-27T09:49:58.000000Z",
            "issued_at": "2030-08-27T08:49:58.000000Z",
            "catalog": []
        }}))
        .unwrap();
        let token = token.token;
        assert_eq!("alice", token.user.name);
        assert_eq!(Some("p1"), token.project.as_ref().map(|x| x.id.as_str()));
        assert!(token.domain.is_none());
        assert_eq!("monitoring_viewer", token.roles[0].name);
        assert_eq!(
            "2030-08-27T09:49:58+00:00",
            token.expires_at.to_rfc3339()
        );
        assert!(token.catalog.is_some());
    }

    #[test]
    fn test_expiry() {
        let token = IdentityToken {
            id: "tok".into(),
            token: TokenBuilder::default()
                .user(TokenUser::default())
                .expires_at(Utc::now() - chrono::TimeDelta::seconds(1))
                .build()
                .unwrap(),
        };
        assert!(token.is_expired());
    }
}
