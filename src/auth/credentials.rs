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
//! # Credential extraction
//!
//! Credentials are taken from the `X-Auth-Token` header when present and
//! from the basic authentication otherwise. The basic authentication
//! username has the form `user[@domain][|scope]` where the scope is
//! `project@domain`, `@domain` or a bare project ID. The `project_id` and
//! `domain_id` query parameters override the scope and are removed from the
//! forwarded request.

use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::SecretString;
use tracing::debug;
use url::form_urlencoded;

use crate::auth::error::AuthenticationError;
use crate::auth::types::{CredentialRequest, ScopeRequest, UserRef};

/// Header carrying the token.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";
/// Header naming the user domain when the username lacks one.
pub const USER_DOMAIN_HEADER: &str = "x-user-domain-name";

const BASIC_PREFIX: &str = "basic ";

/// Credentials extracted from a request.
#[derive(Clone, Debug)]
pub struct ExtractedCredentials {
    pub request: CredentialRequest,
    /// Whether the scope may be guessed: password credentials without any
    /// scope given in the username or the query.
    pub guess_allowed: bool,
}

/// Decoded basic authentication (`username`, `password`).
fn basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let prefix = value.get(..BASIC_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BASIC_PREFIX) {
        return None;
    }
    let decoded = STANDARD.decode(&value[BASIC_PREFIX.len()..]).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Parse the user part of the username. Without an `@domain` suffix the
/// `domain_hint` applies; without both the part is a user ID.
pub fn parse_user(user: &str, domain_hint: Option<&str>) -> UserRef {
    match user.rsplit_once('@') {
        Some((name, domain)) => UserRef::Name {
            name: name.to_string(),
            domain_name: domain.to_string(),
        },
        None => match domain_hint.filter(|hint| !hint.is_empty()) {
            Some(domain) => UserRef::Name {
                name: user.to_string(),
                domain_name: domain.to_string(),
            },
            None => UserRef::Id(user.to_string()),
        },
    }
}

/// Parse the scope part of the username.
pub fn parse_scope(scope: &str) -> ScopeRequest {
    match scope.rsplit_once('@') {
        Some(("", domain)) => ScopeRequest::DomainName(domain.to_string()),
        Some((project, domain)) => ScopeRequest::ProjectName {
            name: project.to_string(),
            domain_name: domain.to_string(),
        },
        None if scope.is_empty() => ScopeRequest::Unscoped,
        None => ScopeRequest::ProjectId(scope.to_string()),
    }
}

/// Parse the full basic authentication username. The scope is `None` when
/// the username has no `|` at all. Fields after a second `|` are ignored.
pub fn parse_username(username: &str, domain_hint: Option<&str>) -> (UserRef, Option<ScopeRequest>) {
    match username.split_once('|') {
        Some((user, rest)) => {
            let scope = rest.split_once('|').map_or(rest, |(scope, _)| scope);
            (parse_user(user, domain_hint), Some(parse_scope(scope)))
        }
        None => (parse_user(username, domain_hint), None),
    }
}

/// The scope requested with the query parameters, with the name of the
/// parameter it was taken from. `project_id` wins over `domain_id`.
fn query_scope(uri: &Uri) -> Option<(ScopeRequest, &'static str)> {
    let query = uri.query()?;
    let first = |key: &str| {
        form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    };
    if let Some(project_id) = first("project_id") {
        Some((ScopeRequest::ProjectId(project_id), "project_id"))
    } else {
        first("domain_id").map(|domain_id| (ScopeRequest::DomainId(domain_id), "domain_id"))
    }
}

/// The `uri` without the `param` query parameter.
fn strip_query_param(uri: &Uri, param: &str) -> Option<Uri> {
    let query = uri.query()?;
    let remaining: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .filter(|(name, _)| name != param)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    let mut path_and_query = uri.path().to_string();
    if !remaining.is_empty() {
        path_and_query.push('?');
        path_and_query.push_str(
            &form_urlencoded::Serializer::new(String::new())
                .extend_pairs(remaining)
                .finish(),
        );
    }
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}

/// Extract the credentials from the request. The consumed scope query
/// parameter is removed from the request URI.
pub fn extract_credentials(
    parts: &mut Parts,
) -> Result<ExtractedCredentials, AuthenticationError> {
    let query_override = query_scope(&parts.uri);
    if let Some((_, param)) = &query_override
        && let Some(uri) = strip_query_param(&parts.uri, param)
    {
        parts.uri = uri;
    }

    let token = parts
        .headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty());

    let (mut request, guess_allowed) = if let Some(token) = token {
        (CredentialRequest::token(SecretString::from(token)), false)
    } else if let Some((username, password)) = basic_auth(&parts.headers) {
        let hint = parts
            .headers
            .get(USER_DOMAIN_HEADER)
            .and_then(|value| value.to_str().ok());
        let (user, scope) = parse_username(&username, hint);
        let guess_allowed = scope.is_none();
        (
            CredentialRequest::password(user, password).with_scope(scope.unwrap_or_default()),
            guess_allowed,
        )
    } else {
        return Err(AuthenticationError::MissingCredentials(
            "Authorization header missing (no username/password or token)".into(),
        ));
    };

    if let Some((scope, param)) = query_override {
        debug!("scope overridden with the {} query parameter: {}", param, scope);
        request.scope = scope;
        return Ok(ExtractedCredentials {
            request,
            guess_allowed: false,
        });
    }
    Ok(ExtractedCredentials {
        request,
        guess_allowed,
    })
}
