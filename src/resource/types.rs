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
//! Resource types.

use serde::{Deserialize, Serialize};

/// Project on which the user holds a monitoring role.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct AuthorizedScope {
    pub project_id: String,
    pub project_name: String,
    /// Domain of the project.
    pub domain_id: String,
    /// Empty when the domain is not known to the registry.
    pub domain_name: String,
}
