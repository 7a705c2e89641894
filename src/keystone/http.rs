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
//! # Keystone HTTP client

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Client, Proxy, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use crate::config::Config;
use crate::keystone::{IdentityApi, IdentityConnector, KeystoneClientError, types::*};

const AUTH_TOKEN_HEADER: &str = "x-auth-token";
const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";

/// Creates [`HttpIdentityClient`] instances for the configured Keystone.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    auth_url: Url,
    proxy: Option<Url>,
}

impl HttpConnector {
    pub fn new(auth_url: Url, proxy: Option<Url>) -> Self {
        Self { auth_url, proxy }
    }

    pub fn from_config(config: &Config) -> Result<Self, KeystoneClientError> {
        Ok(Self::new(
            config
                .keystone
                .auth_url
                .clone()
                .ok_or(KeystoneClientError::AuthUrlMissing)?,
            config.default.proxy.clone(),
        ))
    }
}

impl IdentityConnector for HttpConnector {
    fn connect(&self) -> Result<Arc<dyn IdentityApi>, KeystoneClientError> {
        Ok(Arc::new(HttpIdentityClient::new(
            &self.auth_url,
            self.proxy.as_ref(),
        )?))
    }
}

/// Keystone v3 REST client.
#[derive(Clone, Debug)]
pub struct HttpIdentityClient {
    client: Client,
    /// Identity API root, always ending with `/v3/`.
    base_url: Url,
}

/// Append the `v3/` API version unless already present.
fn normalize_auth_url(auth_url: &Url) -> Url {
    let mut url = auth_url.clone();
    let path = url.path().trim_end_matches('/').to_string();
    if path.ends_with("/v3") {
        url.set_path(&format!("{path}/"));
    } else {
        url.set_path(&format!("{path}/v3/"));
    }
    url.set_query(None);
    url
}

fn secret_header(token: &SecretString) -> Result<HeaderValue, KeystoneClientError> {
    let mut value = HeaderValue::from_str(token.expose_secret())
        .map_err(|_| KeystoneClientError::InvalidToken)?;
    value.set_sensitive(true);
    Ok(value)
}

/// Pass successful responses through, turn the rest into
/// [`KeystoneClientError::Rejected`].
async fn check_status(response: Response) -> Result<Response, KeystoneClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    // Keystone error body: {"error": {"code": 401, "message": "...", "title": "..."}}
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|val| val["error"]["message"].as_str().map(String::from))
        .unwrap_or(body);
    debug!("keystone returned {}: {}", status, message);
    Err(KeystoneClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}

impl HttpIdentityClient {
    pub fn new(auth_url: &Url, proxy: Option<&Url>) -> Result<Self, KeystoneClientError> {
        let mut client_builder = Client::builder()
            .gzip(true)
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90));
        if let Some(proxy) = proxy {
            client_builder = client_builder.proxy(
                Proxy::all(proxy.as_str())
                    .map_err(|source| KeystoneClientError::ClientBuild { source })?,
            );
        }
        Ok(Self {
            client: client_builder
                .build()
                .map_err(|source| KeystoneClientError::ClientBuild { source })?,
            base_url: normalize_auth_url(auth_url),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, KeystoneClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// GET a collection and follow the `links.next` until all pages are
    /// consumed.
    async fn list<T, Q>(
        &self,
        token: &SecretString,
        path: &str,
        query: Option<&Q>,
        key: &str,
    ) -> Result<Vec<T>, KeystoneClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let auth = secret_header(token)?;
        let mut result: Vec<T> = Vec::new();
        let mut visited: Vec<Url> = Vec::new();
        let mut url = self.endpoint(path)?;
        let mut request = self.client.get(url.clone());
        if let Some(query) = query {
            request = request.query(query);
        }
        loop {
            trace!("listing {}", url);
            let response = check_status(
                request
                    .header(AUTH_TOKEN_HEADER, auth.clone())
                    .send()
                    .await?,
            )
            .await?;
            let mut page: Value = response.json().await?;
            let items = page
                .get_mut(key)
                .map(Value::take)
                .ok_or_else(|| KeystoneClientError::Decode(format!("`{key}` missing in response")))?;
            result.extend(serde_json::from_value::<Vec<T>>(items)?);

            visited.push(url);
            match page["links"]["next"].as_str() {
                Some(next) => {
                    url = self.base_url.join(next)?;
                    if visited.contains(&url) {
                        debug!("pagination loop detected at {}", url);
                        break;
                    }
                    request = self.client.get(url.clone());
                }
                None => break,
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl IdentityApi for HttpIdentityClient {
    #[tracing::instrument(level = "debug", skip(self, request))]
    async fn create_token(
        &self,
        request: &AuthRequest,
    ) -> Result<IdentityToken, KeystoneClientError> {
        let response = check_status(
            self.client
                .post(self.endpoint("auth/tokens")?)
                .json(request)
                .send()
                .await?,
        )
        .await?;
        let id = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|val| val.to_str().ok())
            .map(|val| SecretString::from(val.to_string()))
            .ok_or(KeystoneClientError::SubjectTokenMissing)?;
        let body: TokenResponse = response.json().await?;
        Ok(IdentityToken {
            id,
            token: body.token,
        })
    }

    #[tracing::instrument(level = "debug", skip(self, token, subject_token))]
    async fn validate_token(
        &self,
        token: &SecretString,
        subject_token: &SecretString,
    ) -> Result<IdentityToken, KeystoneClientError> {
        let response = check_status(
            self.client
                .get(self.endpoint("auth/tokens")?)
                .header(AUTH_TOKEN_HEADER, secret_header(token)?)
                .header(SUBJECT_TOKEN_HEADER, secret_header(subject_token)?)
                .send()
                .await?,
        )
        .await?;
        let body: TokenResponse = response.json().await?;
        Ok(IdentityToken {
            id: subject_token.clone(),
            token: body.token,
        })
    }

    #[tracing::instrument(level = "debug", skip(self, token))]
    async fn list_projects(
        &self,
        token: &SecretString,
        params: &ProjectListParameters,
    ) -> Result<Vec<Project>, KeystoneClientError> {
        self.list(token, "projects", Some(params), "projects").await
    }

    #[tracing::instrument(level = "debug", skip(self, token))]
    async fn get_project<'a>(
        &self,
        token: &SecretString,
        project_id: &'a str,
    ) -> Result<Project, KeystoneClientError> {
        let response = check_status(
            self.client
                .get(self.endpoint(&format!("projects/{project_id}"))?)
                .header(AUTH_TOKEN_HEADER, secret_header(token)?)
                .send()
                .await?,
        )
        .await?;
        let mut body: Value = response.json().await?;
        Ok(serde_json::from_value(body["project"].take())?)
    }

    #[tracing::instrument(level = "debug", skip(self, token))]
    async fn list_role_assignments(
        &self,
        token: &SecretString,
        params: &RoleAssignmentListParameters,
    ) -> Result<Vec<RoleAssignment>, KeystoneClientError> {
        self.list(token, "role_assignments", Some(params), "role_assignments")
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, token))]
    async fn list_users(
        &self,
        token: &SecretString,
        params: &UserListParameters,
    ) -> Result<Vec<User>, KeystoneClientError> {
        self.list(token, "users", Some(params), "users").await
    }

    #[tracing::instrument(level = "debug", skip(self, token))]
    async fn list_roles(&self, token: &SecretString) -> Result<Vec<Role>, KeystoneClientError> {
        self.list::<Role, ()>(token, "roles", None, "roles").await
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;

    fn client(srv: &MockServer) -> HttpIdentityClient {
        HttpIdentityClient::new(&Url::parse(&srv.base_url()).unwrap(), None).unwrap()
    }

    fn token_body() -> Value {
        json!({"token": {
            "methods": ["password"],
            "user": {"id": "uid", "name": "alice", "domain": {"id": "did", "name": "Default"}},
            "project": {"id": "pid", "name": "proj", "domain": {"id": "did", "name": "Default"}},
            "roles": [{"id": "rid", "name": "monitoring_viewer"}],
            "expires_at": "2099-01-01T00:00:00.000000Z",
            "catalog": [{"type": "metrics", "endpoints": [
                {"interface": "public", "region": "r1", "url": "https://maia.local"}
            ]}]
        }})
    }

    #[test]
    fn test_normalize_auth_url() {
        for (url, expected) in [
            ("https://keystone.local:5000", "https://keystone.local:5000/v3/"),
            ("https://keystone.local:5000/", "https://keystone.local:5000/v3/"),
            ("https://keystone.local:5000/v3", "https://keystone.local:5000/v3/"),
            ("https://keystone.local/identity/v3/", "https://keystone.local/identity/v3/"),
            ("https://keystone.local/identity", "https://keystone.local/identity/v3/"),
        ] {
            assert_eq!(
                expected,
                normalize_auth_url(&Url::parse(url).unwrap()).as_str()
            );
        }
    }

    #[tokio::test]
    async fn test_create_token() {
        let srv = MockServer::start_async().await;
        let mock = srv
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/v3/auth/tokens")
                    .json_body_includes(
                        json!({"auth": {"identity": {"methods": ["password"]}}}).to_string(),
                    );
                then.status(201)
                    .header("content-type", "application/json")
                    .header("x-subject-token", "user-token")
                    .json_body(token_body());
            })
            .await;

        let request = AuthRequest::password(
            UserPasswordBuilder::default()
                .id("uid")
                .password("pass")
                .build()
                .unwrap(),
            None,
        )
        .unwrap();
        let token = client(&srv).create_token(&request).await.unwrap();
        mock.assert_async().await;
        assert_eq!("user-token", token.id.expose_secret());
        assert_eq!("alice", token.token.user.name);
    }

    #[tokio::test]
    async fn test_create_token_missing_subject() {
        let srv = MockServer::start_async().await;
        srv.mock_async(|when, then| {
            when.method("POST").path("/v3/auth/tokens");
            then.status(201)
                .header("content-type", "application/json")
                .json_body(token_body());
        })
        .await;
        let request = AuthRequest::token("tok".into(), None).unwrap();
        assert!(matches!(
            client(&srv).create_token(&request).await,
            Err(KeystoneClientError::SubjectTokenMissing)
        ));
    }

    #[tokio::test]
    async fn test_create_token_rejected() {
        let srv = MockServer::start_async().await;
        srv.mock_async(|when, then| {
            when.method("POST").path("/v3/auth/tokens");
            then.status(401)
                .header("content-type", "application/json")
                .json_body(json!({"error": {"code": 401, "message": "The request you have made requires authentication.", "title": "Unauthorized"}}));
        })
        .await;
        let request = AuthRequest::token("tok".into(), None).unwrap();
        match client(&srv).create_token(&request).await {
            Err(KeystoneClientError::Rejected { status, message }) => {
                assert_eq!(401, status);
                assert_eq!("The request you have made requires authentication.", message);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validate_token() {
        let srv = MockServer::start_async().await;
        let mock = srv
            .mock_async(|when, then| {
                when.method("GET")
                    .path("/v3/auth/tokens")
                    .header("x-auth-token", "service-token")
                    .header("x-subject-token", "user-token");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(token_body());
            })
            .await;
        let token = client(&srv)
            .validate_token(&"service-token".into(), &"user-token".into())
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!("user-token", token.id.expose_secret());
        assert_eq!(Some("pid"), token.token.project.as_ref().map(|x| x.id.as_str()));
    }

    #[tokio::test]
    async fn test_list_projects_pagination() {
        let srv = MockServer::start_async().await;
        let next = format!("{}/v3/projects?parent_id=p0&marker=p2", srv.base_url());
        let first = srv
            .mock_async(|when, then| {
                when.method("GET")
                    .path("/v3/projects")
                    .query_param("parent_id", "p0")
                    .query_param("enabled", "true")
                    .header("x-auth-token", "service-token");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "projects": [{"id": "p1", "name": "one", "domain_id": "d"}, {"id": "p2", "name": "two", "domain_id": "d"}],
                        "links": {"next": next, "self": "ignored"}
                    }));
            })
            .await;
        let second = srv
            .mock_async(|when, then| {
                when.method("GET")
                    .path("/v3/projects")
                    .query_param("marker", "p2")
                    .header("x-auth-token", "service-token");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "projects": [{"id": "p3", "name": "three", "domain_id": "d"}],
                        "links": {"next": null}
                    }));
            })
            .await;

        let projects = client(&srv)
            .list_projects(
                &"service-token".into(),
                &ProjectListParametersBuilder::default()
                    .parent_id("p0")
                    .enabled(true)
                    .build()
                    .unwrap(),
            )
            .await
            .unwrap();
        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(
            vec!["p1", "p2", "p3"],
            projects.iter().map(|x| x.id.as_str()).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_list_role_assignments_query() {
        let srv = MockServer::start_async().await;
        let mock = srv
            .mock_async(|when, then| {
                when.method("GET")
                    .path("/v3/role_assignments")
                    .query_param("user.id", "uid")
                    .query_param("effective", "true");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "role_assignments": [
                            {"role": {"id": "rid"}, "user": {"id": "uid"}, "scope": {"project": {"id": "pid"}}},
                            {"role": {"id": "rid"}, "user": {"id": "uid"}, "scope": {"domain": {"id": "did"}}}
                        ],
                        "links": {"next": null}
                    }));
            })
            .await;
        let assignments = client(&srv)
            .list_role_assignments(
                &"service-token".into(),
                &RoleAssignmentListParametersBuilder::default()
                    .user_id("uid")
                    .effective(true)
                    .build()
                    .unwrap(),
            )
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(Some("pid"), assignments[0].project_id());
        assert_eq!(None, assignments[1].project_id());
    }

    #[tokio::test]
    async fn test_get_project_not_found() {
        let srv = MockServer::start_async().await;
        srv.mock_async(|when, then| {
            when.method("GET").path("/v3/projects/missing");
            then.status(404).body("not found");
        })
        .await;
        let err = client(&srv)
            .get_project(&"service-token".into(), "missing")
            .await
            .unwrap_err();
        assert!(err.is_rejection());
        assert!(!err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_unreachable() {
        let client = HttpIdentityClient::new(&Url::parse("http://127.0.0.1:1").unwrap(), None)
            .unwrap();
        let err = client.list_roles(&"service-token".into()).await.unwrap_err();
        assert!(matches!(err, KeystoneClientError::Unreachable { .. }));
        assert!(!err.is_rejection());
    }
}
