//! Shared helpers for identity service integration tests

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cloudmgr_identity::IdentityClient;

pub const TEST_TOKEN: &str = "test-admin-token";

/// Starts a mock identity service and returns a client pointing at it
pub async fn setup_identity_mock() -> (MockServer, IdentityClient) {
    let server = MockServer::start().await;
    let client = IdentityClient::new(&format!("{}/v3", server.uri()), Some(TEST_TOKEN.into()))
        .expect("client should build");
    (server, client)
}

/// Mounts `GET /v3/projects/{name}` returning the given project
pub async fn mount_existing_project(server: &MockServer, id: &str, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v3/projects/{name}")))
        .and(header("X-Auth-Token", TEST_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "project": { "id": id, "name": name, "domain_id": "default" }
        })))
        .mount(server)
        .await;
}

/// Mounts `GET /v3/projects/{name}` answering 404
pub async fn mount_missing_project(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v3/projects/{name}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "code": 404, "class": "NotFoundError" }
        })))
        .mount(server)
        .await;
}
