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
//! Credential and scope model.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use url::Url;

use crate::auth::truncate_token;
use crate::error::BuilderError;
use crate::keystone::types::{
    AuthRequest, DomainRef, IdentityToken, ProjectRef, Scope, UserPasswordBuilder,
};
use crate::policy::AuthorizationContext;

/// User reference of the password authentication.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UserRef {
    /// Raw user ID.
    Id(String),
    /// User name within the named domain.
    Name { name: String, domain_name: String },
}

impl UserRef {
    fn is_empty(&self) -> bool {
        match self {
            Self::Id(id) => id.is_empty(),
            Self::Name { name, .. } => name.is_empty(),
        }
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name { name, domain_name } => write!(f, "{name}@{domain_name}"),
        }
    }
}

/// Presented credentials.
#[derive(Clone, Debug)]
pub enum Credentials {
    /// Bearer token.
    Token(SecretString),
    /// User and password.
    Password {
        user: UserRef,
        password: SecretString,
    },
}

/// Requested authorization scope. A project name is only meaningful
/// together with its domain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScopeRequest {
    #[default]
    Unscoped,
    ProjectId(String),
    ProjectName {
        name: String,
        domain_name: String,
    },
    DomainId(String),
    DomainName(String),
}

impl ScopeRequest {
    pub fn is_unscoped(&self) -> bool {
        matches!(self, Self::Unscoped)
    }

    fn to_scope(&self) -> Option<Scope> {
        match self {
            Self::Unscoped => None,
            Self::ProjectId(id) => Some(Scope::Project(ProjectRef {
                id: Some(id.clone()),
                ..Default::default()
            })),
            Self::ProjectName { name, domain_name } => Some(Scope::Project(ProjectRef {
                name: Some(name.clone()),
                domain: Some(DomainRef::with_name(domain_name)),
                ..Default::default()
            })),
            Self::DomainId(id) => Some(Scope::Domain(DomainRef::with_id(id))),
            Self::DomainName(name) => Some(Scope::Domain(DomainRef::with_name(name))),
        }
    }
}

impl fmt::Display for ScopeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unscoped => write!(f, "unscoped"),
            Self::ProjectId(id) => write!(f, "project {id}"),
            Self::ProjectName { name, domain_name } => write!(f, "project {name}@{domain_name}"),
            Self::DomainId(id) => write!(f, "domain {id}"),
            Self::DomainName(name) => write!(f, "domain @{name}"),
        }
    }
}

/// Normalized credentials together with the requested scope.
#[derive(Clone, Debug)]
pub struct CredentialRequest {
    pub credentials: Credentials,
    pub scope: ScopeRequest,
}

impl CredentialRequest {
    pub fn token<S: Into<SecretString>>(token: S) -> Self {
        Self {
            credentials: Credentials::Token(token.into()),
            scope: ScopeRequest::Unscoped,
        }
    }

    pub fn password<P: Into<SecretString>>(user: UserRef, password: P) -> Self {
        Self {
            credentials: Credentials::Password {
                user,
                password: password.into(),
            },
            scope: ScopeRequest::Unscoped,
        }
    }

    pub fn with_scope(mut self, scope: ScopeRequest) -> Self {
        self.scope = scope;
        self
    }

    /// Whether a user (name or ID) or a token is present at all.
    pub fn has_identity(&self) -> bool {
        match &self.credentials {
            Credentials::Token(token) => !token.expose_secret().is_empty(),
            Credentials::Password { user, .. } => !user.is_empty(),
        }
    }

    /// Key identifying these credentials with this scope.
    pub fn cache_key(&self) -> CacheKey {
        match &self.credentials {
            Credentials::Token(token) => CacheKey::Token {
                token: token.expose_secret().to_string(),
                scope: self.scope.clone(),
            },
            Credentials::Password { user, password } => CacheKey::Password {
                user: user.clone(),
                password: password.expose_secret().to_string(),
                scope: self.scope.clone(),
            },
        }
    }

    /// Token issue request for these credentials.
    pub fn to_auth_request(&self) -> Result<AuthRequest, BuilderError> {
        match &self.credentials {
            Credentials::Token(token) => AuthRequest::token(token.clone(), self.scope.to_scope()),
            Credentials::Password { user, password } => {
                let mut builder = UserPasswordBuilder::default();
                builder.password(password.clone());
                match user {
                    UserRef::Id(id) => {
                        builder.id(id);
                    }
                    UserRef::Name { name, domain_name } => {
                        builder.name(name);
                        builder.domain(DomainRef::with_name(domain_name));
                    }
                }
                AuthRequest::password(builder.build()?, self.scope.to_scope())
            }
        }
    }
}

/// Structured authentication cache key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Token {
        token: String,
        scope: ScopeRequest,
    },
    Password {
        user: UserRef,
        password: String,
        scope: ScopeRequest,
    },
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { token, scope } => f
                .debug_struct("Token")
                .field("token", &format_args!("{}...", truncate_token(token)))
                .field("scope", scope)
                .finish(),
            Self::Password { user, scope, .. } => f
                .debug_struct("Password")
                .field("user", user)
                .field("scope", scope)
                .finish_non_exhaustive(),
        }
    }
}

/// Successful authentication.
#[derive(Debug)]
pub struct Authentication {
    /// Verified token.
    pub token: IdentityToken,
    /// Authorization context derived from the `token`.
    pub context: AuthorizationContext,
    /// The gateway endpoint from the token catalog.
    pub endpoint: Url,
}
