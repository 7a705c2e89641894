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
//! # HTTP surface
//!
//! The [`Authenticated`] extractor lets the gateway handlers require an
//! authenticated request. The request handed to the handler carries the
//! identity headers and no longer has the consumed scope query parameter.
//!
//! ```ignore
//! async fn query(Authenticated(auth): Authenticated<true>) -> String {
//!     auth.context.project_id().unwrap_or_default().to_string()
//! }
//! ```
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use std::sync::Arc;

pub mod error;

use crate::auth::{Authentication, AuthenticationError};
use crate::gatekeeper::GatekeeperState;

/// Authenticated request. With `GUESS_SCOPE` a basic authentication
/// without a scope is scoped to a project with a monitoring role.
#[derive(Clone, Debug)]
pub struct Authenticated<const GUESS_SCOPE: bool = false>(pub Arc<Authentication>);

impl<S, const GUESS_SCOPE: bool> FromRequestParts<S> for Authenticated<GUESS_SCOPE>
where
    GatekeeperState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthenticationError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gatekeeper = GatekeeperState::from_ref(state);
        gatekeeper
            .authenticate_request(parts, GUESS_SCOPE)
            .await
            .map(Self)
    }
}
