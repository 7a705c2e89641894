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
//! # Error
//!
//! Errors that can occur while setting up and operating the gatekeeper
//! (not the per-request authentication errors).
use thiserror::Error;

use crate::keystone::KeystoneClientError;
use crate::session::SessionError;

/// Gatekeeper error.
#[derive(Debug, Error)]
pub enum GatekeeperError {
    /// Identity provider client error.
    #[error(transparent)]
    Client {
        #[from]
        source: KeystoneClientError,
    },

    /// Service session error.
    #[error(transparent)]
    Session {
        #[from]
        source: SessionError,
    },
}

/// Builder error.
///
/// Shared error type of the `derive_builder` generated builders.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuilderError {
    /// Uninitialized field.
    #[error("{0}")]
    UninitializedField(String),
    /// Custom validation error.
    #[error("{0}")]
    Validation(String),
}

impl From<String> for BuilderError {
    fn from(s: String) -> Self {
        Self::Validation(s)
    }
}

impl From<derive_builder::UninitializedFieldError> for BuilderError {
    fn from(ufe: derive_builder::UninitializedFieldError) -> Self {
        Self::UninitializedField(ufe.to_string())
    }
}
