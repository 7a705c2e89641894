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

use httpmock::MockServer;
use serde_json::json;

use keystone_gatekeeper::resource::{AuthorizedScope, ResourceError};

use crate::common::*;

async fn mock_children(srv: &MockServer, parent_id: &str, children: &[&str]) {
    let projects: Vec<_> = children
        .iter()
        .map(|id| json!({"id": id, "name": id, "domain_id": "d-default", "parent_id": parent_id, "enabled": true}))
        .collect();
    srv.mock_async(|when, then| {
        when.method("GET")
            .path("/v3/projects")
            .query_param("parent_id", parent_id)
            .query_param("enabled", "true");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"projects": projects}));
    })
    .await;
}

#[tokio::test]
async fn test_child_projects() {
    let srv = MockServer::start_async().await;
    let login = mock_service_login(&srv).await;
    mock_registry(&srv).await;
    mock_children(&srv, "root", &["a", "b"]).await;
    mock_children(&srv, "a", &["a1"]).await;
    mock_children(&srv, "a1", &[]).await;
    mock_children(&srv, "b", &[]).await;

    let gatekeeper = gatekeeper(&srv);
    assert_eq!(
        vec!["a", "a1", "b"],
        gatekeeper.child_projects("root").await.unwrap()
    );
    // cached
    assert_eq!(
        vec!["a", "a1", "b"],
        gatekeeper.child_projects("root").await.unwrap()
    );
    login.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_child_projects_cycle() {
    let srv = MockServer::start_async().await;
    mock_service_login(&srv).await;
    mock_registry(&srv).await;
    mock_children(&srv, "root", &["a"]).await;
    mock_children(&srv, "a", &["root"]).await;

    assert!(matches!(
        gatekeeper(&srv).child_projects("root").await,
        Err(ResourceError::HierarchyCycle { .. })
    ));
}

#[tokio::test]
async fn test_user_projects() {
    let srv = MockServer::start_async().await;
    mock_service_login(&srv).await;
    mock_registry(&srv).await;
    srv.mock_async(|when, then| {
        when.method("GET")
            .path("/v3/role_assignments")
            .query_param("user.id", "uid");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "role_assignments": [
                    {"role": {"id": "r-monitoring-viewer"}, "group": {"id": "g1"}, "scope": {"project": {"id": "p1"}}},
                    {"role": {"id": "r-monitoring-viewer"}, "user": {"id": "uid"}, "scope": {"project": {"id": "p1"}}},
                    {"role": {"id": "r-monitoring-viewer"}, "user": {"id": "uid"}, "scope": {"domain": {"id": "d-default"}}}
                ],
                "links": {"next": null}
            }));
    })
    .await;
    let project = srv
        .mock_async(|when, then| {
            when.method("GET")
                .path("/v3/projects/p1")
                .header("x-auth-token", "service-token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"project": {
                    "id": "p1", "name": "proj", "domain_id": "d-default", "enabled": true
                }}));
        })
        .await;

    assert_eq!(
        vec![AuthorizedScope {
            project_id: "p1".into(),
            project_name: "proj".into(),
            domain_id: "d-default".into(),
            domain_name: "Default".into(),
        }],
        gatekeeper(&srv).user_projects("uid").await.unwrap()
    );
    project.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_service_url() {
    let srv = MockServer::start_async().await;
    mock_service_login(&srv).await;
    mock_registry(&srv).await;

    let gatekeeper = gatekeeper(&srv);
    let sweeper = gatekeeper.start().await;
    assert_eq!(
        "https://maia.local/",
        gatekeeper.service_url().await.unwrap().as_str()
    );
    gatekeeper.terminate();
    sweeper.await.unwrap();
}

#[tokio::test]
async fn test_service_login_failure() {
    let srv = MockServer::start_async().await;
    srv.mock_async(|when, then| {
        when.method("POST").path("/v3/auth/tokens");
        then.status(401)
            .header("content-type", "application/json")
            .json_body(json!({"error": {"code": 401, "message": "The request you have made requires authentication.", "title": "Unauthorized"}}));
    })
    .await;

    assert!(matches!(
        gatekeeper(&srv).child_projects("root").await,
        Err(ResourceError::Session { .. })
    ));
}
