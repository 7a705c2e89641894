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

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::auth::AuthenticationError;

impl AuthenticationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredentials(_) | Self::WrongCredentials(_) => StatusCode::UNAUTHORIZED,
            Self::NoPermission { .. } => StatusCode::FORBIDDEN,
            Self::NotAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AuthenticationError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if self.is_retryable() {
            warn!("Authentication not available: {}", self);
        }
        (
            status_code,
            Json(json!({"error": {"code": status_code.as_u16(), "message": self.to_string()}})),
        )
            .into_response()
    }
}
