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

use axum::http::Request;
use axum::http::request::Parts;
use httpmock::{Mock, MockServer};
use serde_json::{Value, json};
use url::Url;

use keystone_gatekeeper::config::Config;
use keystone_gatekeeper::gatekeeper::Gatekeeper;

/// Configuration with the service user `maia` of the `service` project
/// authenticating against the mock server.
pub fn config(srv: &MockServer) -> Config {
    let mut config = Config::default();
    config.keystone.auth_url = Some(Url::parse(&srv.url("/v3")).unwrap());
    config.keystone.username = Some("maia".into());
    config.keystone.password = Some("secret".into());
    config.keystone.user_domain_name = Some("Default".into());
    config.keystone.project_name = Some("service".into());
    config.keystone.project_domain_name = Some("Default".into());
    config.keystone.roles = vec!["monitoring_viewer".into()];
    config
}

pub fn gatekeeper(srv: &MockServer) -> Gatekeeper {
    Gatekeeper::from_config(config(srv)).unwrap()
}

pub fn request_parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(()).unwrap().into_parts().0
}

/// Token body of the user scoped to the project.
pub fn token_body(user: (&str, &str), project: (&str, &str)) -> Value {
    json!({"token": {
        "methods": ["password"],
        "user": {"id": user.0, "name": user.1, "domain": {"id": "d-default", "name": "Default"}},
        "project": {"id": project.0, "name": project.1, "domain": {"id": "d-default", "name": "Default"}},
        "roles": [{"id": "r-monitoring-viewer", "name": "monitoring_viewer"}],
        "expires_at": "2099-01-01T00:00:00.000000Z",
        "catalog": [
            {"type": "identity", "name": "keystone", "endpoints": [
                {"interface": "public", "region": "r1", "url": "http://keystone.local:5000/v3"}
            ]},
            {"type": "metrics", "name": "maia", "endpoints": [
                {"interface": "public", "region": "r1", "url": "https://maia.local"}
            ]}
        ]
    }})
}

/// Password login of the service user.
pub async fn mock_service_login(srv: &MockServer) -> Mock<'_> {
    srv.mock_async(|when, then| {
        when.method("POST").path("/v3/auth/tokens").json_body_includes(
            json!({"auth": {"identity": {"password": {"user": {"name": "maia"}}}}}).to_string(),
        );
        then.status(201)
            .header("content-type", "application/json")
            .header("x-subject-token", "service-token")
            .json_body(token_body(("maia-id", "maia"), ("p-service", "service")));
    })
    .await
}

/// Monitoring role and domain listings.
pub async fn mock_registry(srv: &MockServer) {
    srv.mock_async(|when, then| {
        when.method("GET")
            .path("/v3/roles")
            .header("x-auth-token", "service-token");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"roles": [
                {"id": "r-monitoring-viewer", "name": "monitoring_viewer"},
                {"id": "r-member", "name": "member"}
            ], "links": {"next": null}}));
    })
    .await;
    srv.mock_async(|when, then| {
        when.method("GET")
            .path("/v3/projects")
            .query_param("is_domain", "true")
            .header("x-auth-token", "service-token");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"projects": [
                {"id": "d-default", "name": "Default", "is_domain": true, "enabled": true}
            ]}));
    })
    .await;
}
