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

use axum::http::StatusCode;
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use httpmock::MockServer;
use serde_json::json;

use keystone_gatekeeper::auth::AuthenticationError;
use keystone_gatekeeper::policy::{PROJECT_NAME, USER_NAME};

use crate::common::*;

fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

#[tokio::test]
async fn test_token_verified_with_service_user() {
    let srv = MockServer::start_async().await;
    let login = mock_service_login(&srv).await;
    mock_registry(&srv).await;
    let validate = srv
        .mock_async(|when, then| {
            when.method("GET")
                .path("/v3/auth/tokens")
                .header("x-auth-token", "service-token")
                .header("x-subject-token", "user-token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(token_body(("uid", "alice"), ("p1", "proj")));
        })
        .await;

    let gatekeeper = gatekeeper(&srv);
    for _ in 0..2 {
        let mut parts = request_parts("/api/v1/query", &[("x-auth-token", "user-token")]);
        let auth = gatekeeper
            .authenticate_request(&mut parts, false)
            .await
            .unwrap();
        assert_eq!(Some("uid"), auth.context.user_id());
        assert_eq!(Some("p1"), auth.context.project_id());
        assert_eq!("https://maia.local/", auth.endpoint.as_str());
        assert_eq!("p1", parts.headers["x-project-id"]);
        assert_eq!("monitoring_viewer", parts.headers["x-roles"]);
        assert_eq!("user-token", parts.headers["x-auth-token"]);
    }
    login.assert_calls_async(1).await;
    validate.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_invalid_token() {
    let srv = MockServer::start_async().await;
    mock_service_login(&srv).await;
    mock_registry(&srv).await;
    srv.mock_async(|when, then| {
        when.method("GET")
            .path("/v3/auth/tokens")
            .header("x-subject-token", "bogus");
        then.status(404)
            .header("content-type", "application/json")
            .json_body(json!({"error": {"code": 404, "message": "Could not find token: bogus.", "title": "Not Found"}}));
    })
    .await;

    let mut parts = request_parts("/", &[("x-auth-token", "bogus")]);
    assert!(matches!(
        gatekeeper(&srv).authenticate_request(&mut parts, false).await,
        Err(AuthenticationError::WrongCredentials(_))
    ));
    assert!(parts.headers.get("x-project-id").is_none());
}

#[tokio::test]
async fn test_password_with_project_scope() {
    let srv = MockServer::start_async().await;
    let login = srv
        .mock_async(|when, then| {
            when.method("POST").path("/v3/auth/tokens").json_body_includes(
                json!({"auth": {
                    "identity": {"password": {"user": {
                        "name": "alice", "domain": {"name": "Default"}, "password": "pw"
                    }}},
                    "scope": {"project": {"name": "proj", "domain": {"name": "Default"}}}
                }})
                .to_string(),
            );
            then.status(201)
                .header("content-type", "application/json")
                .header("x-subject-token", "alice-token")
                .json_body(token_body(("uid", "alice"), ("p1", "proj")));
        })
        .await;

    let gatekeeper = gatekeeper(&srv);
    let authorization = basic("alice@Default|proj@Default", "pw");
    let mut parts = request_parts("/federate", &[("authorization", authorization.as_str())]);
    let auth = gatekeeper
        .authenticate_request(&mut parts, false)
        .await
        .unwrap();
    login.assert_calls_async(1).await;
    assert_eq!(Some("proj"), auth.context.get(PROJECT_NAME));
    assert_eq!(Some("alice"), auth.context.get(USER_NAME));
    assert_eq!("alice-token", parts.headers["x-auth-token"]);
    assert_eq!("proj", parts.headers["x-project-name"]);
}

#[tokio::test]
async fn test_query_scope_override() {
    let srv = MockServer::start_async().await;
    let login = srv
        .mock_async(|when, then| {
            when.method("POST").path("/v3/auth/tokens").json_body_includes(
                json!({"auth": {"scope": {"project": {"id": "p2"}}}}).to_string(),
            );
            then.status(201)
                .header("content-type", "application/json")
                .header("x-subject-token", "alice-token")
                .json_body(token_body(("uid", "alice"), ("p2", "other")));
        })
        .await;

    let authorization = basic("alice@Default|proj@Default", "pw");
    let mut parts = request_parts(
        "/api/v1/query?query=up&project_id=p2",
        &[("authorization", authorization.as_str())],
    );
    let auth = gatekeeper(&srv)
        .authenticate_request(&mut parts, true)
        .await
        .unwrap();
    login.assert_calls_async(1).await;
    assert_eq!(Some("p2"), auth.context.project_id());
    assert_eq!(Some("query=up"), parts.uri.query());
}

#[tokio::test]
async fn test_wrong_password() {
    let srv = MockServer::start_async().await;
    srv.mock_async(|when, then| {
        when.method("POST").path("/v3/auth/tokens");
        then.status(401)
            .header("content-type", "application/json")
            .json_body(json!({"error": {"code": 401, "message": "The request you have made requires authentication.", "title": "Unauthorized"}}));
    })
    .await;

    let authorization = basic("alice@Default|p1", "wrong");
    let mut parts = request_parts("/", &[("authorization", authorization.as_str())]);
    assert!(matches!(
        gatekeeper(&srv).authenticate_request(&mut parts, false).await,
        Err(AuthenticationError::WrongCredentials(_))
    ));
}

#[tokio::test]
async fn test_identity_provider_failure() {
    let srv = MockServer::start_async().await;
    srv.mock_async(|when, then| {
        when.method("POST").path("/v3/auth/tokens");
        then.status(503).body("maintenance");
    })
    .await;

    let authorization = basic("alice@Default|p1", "pw");
    let mut parts = request_parts("/", &[("authorization", authorization.as_str())]);
    let err = gatekeeper(&srv)
        .authenticate_request(&mut parts, false)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_guessed_scope() {
    let srv = MockServer::start_async().await;
    mock_service_login(&srv).await;
    mock_registry(&srv).await;
    srv.mock_async(|when, then| {
        when.method("GET")
            .path("/v3/users")
            .query_param("name", "alice")
            .query_param("domain_id", "d-default");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"users": [
                {"id": "uid", "name": "alice", "domain_id": "d-default", "enabled": true}
            ]}));
    })
    .await;
    srv.mock_async(|when, then| {
        when.method("GET")
            .path("/v3/role_assignments")
            .query_param("user.id", "uid")
            .query_param("effective", "true");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"role_assignments": [
                {"role": {"id": "r-member"}, "user": {"id": "uid"}, "scope": {"project": {"id": "p0"}}},
                {"role": {"id": "r-monitoring-viewer"}, "user": {"id": "uid"}, "scope": {"project": {"id": "p1"}}}
            ]}));
    })
    .await;
    srv.mock_async(|when, then| {
        when.method("GET").path("/v3/projects/p1");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"project": {
                "id": "p1", "name": "proj", "domain_id": "d-default", "enabled": true
            }}));
    })
    .await;
    let login = srv
        .mock_async(|when, then| {
            when.method("POST").path("/v3/auth/tokens").json_body_includes(
                json!({"auth": {
                    "identity": {"password": {"user": {"name": "alice"}}},
                    "scope": {"project": {"id": "p1"}}
                }})
                .to_string(),
            );
            then.status(201)
                .header("content-type", "application/json")
                .header("x-subject-token", "alice-token")
                .json_body(token_body(("uid", "alice"), ("p1", "proj")));
        })
        .await;

    let authorization = basic("alice@Default", "pw");
    let mut parts = request_parts("/", &[("authorization", authorization.as_str())]);
    let auth = gatekeeper(&srv)
        .authenticate_request(&mut parts, true)
        .await
        .unwrap();
    login.assert_calls_async(1).await;
    assert_eq!(Some("p1"), auth.context.project_id());
    assert_eq!("p1", parts.headers["x-project-id"]);
}

#[tokio::test]
async fn test_no_permission() {
    let srv = MockServer::start_async().await;
    mock_service_login(&srv).await;
    mock_registry(&srv).await;
    srv.mock_async(|when, then| {
        when.method("GET")
            .path("/v3/users")
            .query_param("name", "alice")
            .query_param("domain_id", "d-default");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"users": [
                {"id": "uid", "name": "alice", "domain_id": "d-default", "enabled": true}
            ]}));
    })
    .await;
    srv.mock_async(|when, then| {
        when.method("GET")
            .path("/v3/role_assignments")
            .query_param("user.id", "uid");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"role_assignments": []}));
    })
    .await;
    let login = srv
        .mock_async(|when, then| {
            when.method("POST").path("/v3/auth/tokens").json_body_includes(
                json!({"auth": {"identity": {"password": {"user": {"name": "alice"}}}}})
                    .to_string(),
            );
            then.status(201)
                .header("content-type", "application/json")
                .header("x-subject-token", "alice-token")
                .json_body(token_body(("uid", "alice"), ("p1", "proj")));
        })
        .await;

    let authorization = basic("alice@Default", "pw");
    let mut parts = request_parts("/", &[("authorization", authorization.as_str())]);
    let err = gatekeeper(&srv)
        .authenticate_request(&mut parts, true)
        .await
        .unwrap_err();
    login.assert_calls_async(0).await;
    match &err {
        AuthenticationError::NoPermission {
            user,
            required_roles,
        } => {
            assert_eq!("uid (alice@Default)", user);
            assert_eq!(&vec!["monitoring_viewer".to_string()], required_roles);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(StatusCode::FORBIDDEN, err.into_response().status());
    assert!(parts.headers.get("x-user-id").is_none());
}
