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
//! Token issue request (`POST /v3/auth/tokens`).

use derive_builder::Builder;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};

use crate::error::BuilderError;

/// Authentication request.
#[derive(Builder, Clone, Debug, Serialize)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(strip_option, into))]
pub struct AuthRequest {
    /// Authentication body.
    pub auth: Auth,
}

/// Identity and the requested scope.
#[derive(Builder, Clone, Debug, Serialize)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(strip_option, into))]
pub struct Auth {
    pub identity: Identity,

    /// Missing scope requests an unscoped token.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

/// An identity object.
#[derive(Builder, Clone, Debug, Serialize)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(strip_option, into))]
pub struct Identity {
    /// The authentication method.
    pub methods: Vec<String>,

    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<PasswordAuth>,

    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenAuth>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PasswordAuth {
    pub user: UserPassword,
}

/// User identified either by the `id` or by the `name` within the `domain`.
#[derive(Builder, Clone, Debug, Serialize)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(strip_option, into))]
pub struct UserPassword {
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainRef>,

    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

#[derive(Clone, Debug, Serialize)]
pub struct TokenAuth {
    #[serde(serialize_with = "expose")]
    pub id: SecretString,
}

/// Domain reference by `id` or `name`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DomainRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DomainRef {
    pub fn with_id<S: Into<String>>(id: S) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn with_name<S: Into<String>>(name: S) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }
}

/// Requested authorization scope.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Project(ProjectRef),
    Domain(DomainRef),
}

/// Project reference by `id` or by `name` within the `domain`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProjectRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainRef>,
}

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl AuthRequest {
    /// Request authenticating with the user password.
    pub fn password(user: UserPassword, scope: Option<Scope>) -> Result<Self, BuilderError> {
        let mut auth = AuthBuilder::default();
        auth.identity(
            IdentityBuilder::default()
                .methods(vec!["password".to_string()])
                .password(PasswordAuth { user })
                .build()?,
        );
        if let Some(scope) = scope {
            auth.scope(scope);
        }
        AuthRequestBuilder::default().auth(auth.build()?).build()
    }

    /// Request exchanging an existing token.
    pub fn token(token: SecretString, scope: Option<Scope>) -> Result<Self, BuilderError> {
        let mut auth = AuthBuilder::default();
        auth.identity(
            IdentityBuilder::default()
                .methods(vec!["token".to_string()])
                .token(TokenAuth { id: token })
                .build()?,
        );
        if let Some(scope) = scope {
            auth.scope(scope);
        }
        AuthRequestBuilder::default().auth(auth.build()?).build()
    }
}
