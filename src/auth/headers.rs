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
//! Identity headers set on authenticated requests.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::auth::types::Authentication;
use crate::policy::*;

pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const X_USER_NAME: HeaderName = HeaderName::from_static("x-user-name");
pub const X_USER_DOMAIN_ID: HeaderName = HeaderName::from_static("x-user-domain-id");
pub const X_USER_DOMAIN_NAME: HeaderName = HeaderName::from_static("x-user-domain-name");
pub const X_PROJECT_ID: HeaderName = HeaderName::from_static("x-project-id");
pub const X_PROJECT_NAME: HeaderName = HeaderName::from_static("x-project-name");
pub const X_PROJECT_DOMAIN_ID: HeaderName = HeaderName::from_static("x-project-domain-id");
pub const X_PROJECT_DOMAIN_NAME: HeaderName = HeaderName::from_static("x-project-domain-name");
pub const X_DOMAIN_ID: HeaderName = HeaderName::from_static("x-domain-id");
pub const X_DOMAIN_NAME: HeaderName = HeaderName::from_static("x-domain-name");
pub const X_ROLES: HeaderName = HeaderName::from_static("x-roles");
pub const X_AUTH_TOKEN: HeaderName = HeaderName::from_static("x-auth-token");
pub const X_AUTH_TOKEN_EXPIRY: HeaderName = HeaderName::from_static("x-auth-token-expiry");

/// Headers replaced on every authenticated request.
const IDENTITY_HEADERS: [HeaderName; 13] = [
    X_USER_ID,
    X_USER_NAME,
    X_USER_DOMAIN_ID,
    X_USER_DOMAIN_NAME,
    X_PROJECT_ID,
    X_PROJECT_NAME,
    X_PROJECT_DOMAIN_ID,
    X_PROJECT_DOMAIN_NAME,
    X_DOMAIN_ID,
    X_DOMAIN_NAME,
    X_ROLES,
    X_AUTH_TOKEN,
    X_AUTH_TOKEN_EXPIRY,
];

fn header_value(name: &HeaderName, value: &str) -> Option<HeaderValue> {
    HeaderValue::from_bytes(value.as_bytes())
        .inspect_err(|_| warn!("skipping the {} header: invalid value", name))
        .ok()
}

/// Replace the identity headers of the request with the ones of the
/// `auth`. Client supplied identity headers never pass through.
pub fn inject_identity_headers(headers: &mut HeaderMap, auth: &Authentication) {
    for name in &IDENTITY_HEADERS {
        headers.remove(name);
    }
    let ctx = &auth.context;
    let mut set = |name: HeaderName, key: &str| {
        if let Some(value) = ctx.get(key)
            && let Some(value) = header_value(&name, value)
        {
            headers.insert(name, value);
        }
    };

    set(X_USER_ID, USER_ID);
    set(X_USER_NAME, USER_NAME);
    set(X_USER_DOMAIN_ID, USER_DOMAIN_ID);
    set(X_USER_DOMAIN_NAME, USER_DOMAIN_NAME);
    if ctx.project_id().is_some() {
        set(X_PROJECT_ID, PROJECT_ID);
        set(X_PROJECT_NAME, PROJECT_NAME);
        set(X_PROJECT_DOMAIN_ID, PROJECT_DOMAIN_ID);
        set(X_PROJECT_DOMAIN_NAME, PROJECT_DOMAIN_NAME);
    } else {
        set(X_DOMAIN_ID, DOMAIN_ID);
        set(X_DOMAIN_NAME, DOMAIN_NAME);
    }
    set(X_AUTH_TOKEN_EXPIRY, TOKEN_EXPIRY);

    for role in &ctx.roles {
        if let Some(value) = header_value(&X_ROLES, role) {
            headers.append(X_ROLES, value);
        }
    }
    if let Some(token) = ctx.get(TOKEN)
        && let Some(mut value) = header_value(&X_AUTH_TOKEN, token)
    {
        value.set_sensitive(true);
        headers.insert(X_AUTH_TOKEN, value);
    }
}
