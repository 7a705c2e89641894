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
//! Internal mock structures for the [IdentityApi].

use async_trait::async_trait;
use mockall::mock;
use secrecy::SecretString;

use super::error::KeystoneClientError;
use super::types::*;
use super::IdentityApi;

mock! {
    pub IdentityClient {}

    #[async_trait]
    impl IdentityApi for IdentityClient {
        async fn create_token(
            &self,
            request: &AuthRequest,
        ) -> Result<IdentityToken, KeystoneClientError>;

        async fn validate_token(
            &self,
            token: &SecretString,
            subject_token: &SecretString,
        ) -> Result<IdentityToken, KeystoneClientError>;

        async fn list_projects(
            &self,
            token: &SecretString,
            params: &ProjectListParameters,
        ) -> Result<Vec<Project>, KeystoneClientError>;

        async fn get_project<'a>(
            &self,
            token: &SecretString,
            project_id: &'a str,
        ) -> Result<Project, KeystoneClientError>;

        async fn list_role_assignments(
            &self,
            token: &SecretString,
            params: &RoleAssignmentListParameters,
        ) -> Result<Vec<RoleAssignment>, KeystoneClientError>;

        async fn list_users(
            &self,
            token: &SecretString,
            params: &UserListParameters,
        ) -> Result<Vec<User>, KeystoneClientError>;

        async fn list_roles(
            &self,
            token: &SecretString,
        ) -> Result<Vec<Role>, KeystoneClientError>;
    }
}
