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
//! # Request authentication
//!
//! Turns the credentials of an inbound request into a verified
//! [`Authentication`]:
//!
//! 1. the credentials and the requested scope are extracted from the
//!    request ([`credentials`]),
//! 2. a missing scope of a basic authentication is optionally guessed from
//!    the projects on which the user holds a monitoring role,
//! 3. a cached result for the same credentials and scope is returned
//!    directly,
//! 4. otherwise an unscoped token is validated with the service session,
//!    and everything else is exchanged for a new token using a fresh
//!    client,
//! 5. the authorization context is derived from the token and cached
//!    together with the metrics endpoint of the token catalog.
//!
//! On success the identity headers are set on the request ([`headers`]).

mod authenticate;
pub mod credentials;
pub mod error;
pub mod headers;
mod scope;
pub mod types;

pub use credentials::{ExtractedCredentials, extract_credentials};
pub use error::AuthenticationError;
pub use headers::inject_identity_headers;
pub use types::*;

/// Prefix of the `token` safe for logging: the first `1 + len/4`
/// characters.
pub fn truncate_token(token: &str) -> &str {
    let mut end = (1 + token.len() / 4).min(token.len());
    while !token.is_char_boundary(end) {
        end -= 1;
    }
    &token[..end]
}
