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

use crate::error::BuilderError;

/// Identity provider client error.
#[derive(Debug, Error)]
pub enum KeystoneClientError {
    /// The request never got an answer (connect, TLS, proxy, timeout).
    #[error("identity provider is not reachable: {source}")]
    Unreachable {
        /// The source of the error.
        source: reqwest::Error,
    },

    /// The identity provider answered with a non success status.
    #[error("identity provider returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("malformed identity provider response: {0}")]
    Decode(String),

    #[error("missing x-subject-token header")]
    SubjectTokenMissing,

    /// The token cannot be sent as a header value.
    #[error("invalid token")]
    InvalidToken,

    #[error("failed to build the http client: {source}")]
    ClientBuild {
        /// The source of the error.
        source: reqwest::Error,
    },

    #[error("keystone auth_url is not configured")]
    AuthUrlMissing,

    /// Url parsing error
    #[error(transparent)]
    UrlParse {
        #[from]
        source: url::ParseError,
    },

    #[error(transparent)]
    Builder {
        #[from]
        source: BuilderError,
    },
}

impl KeystoneClientError {
    /// The provider rejected the credentials used for the call.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected { status: 401, .. })
    }

    /// The provider was reachable and refused the request (4xx), or the
    /// request could not even be formed from the presented token.
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => (400..500).contains(status),
            Self::InvalidToken => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for KeystoneClientError {
    fn from(source: reqwest::Error) -> Self {
        if source.is_decode() {
            Self::Decode(source.to_string())
        } else {
            Self::Unreachable { source }
        }
    }
}

impl From<serde_json::Error> for KeystoneClientError {
    fn from(source: serde_json::Error) -> Self {
        Self::Decode(source.to_string())
    }
}
