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
//! Internal mock structures for the [ResourceApi].

use async_trait::async_trait;
use mockall::mock;

use super::{AuthorizedScope, ResourceApi, ResourceError};

mock! {
    pub ResourceProvider {}

    #[async_trait]
    impl ResourceApi for ResourceProvider {
        async fn child_projects<'a>(&self, project_id: &'a str) -> Result<Vec<String>, ResourceError>;

        async fn user_projects<'a>(
            &self,
            user_id: &'a str,
        ) -> Result<Vec<AuthorizedScope>, ResourceError>;

        async fn user_id<'a>(
            &self,
            name: &'a str,
            domain_name: &'a str,
        ) -> Result<String, ResourceError>;
    }
}
