//! Project lookup and creation against a mocked identity service

use cloudmgr_core::ports::IIdentityService;
use cloudmgr_identity::IdentityError;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, TEST_TOKEN};

#[tokio::test]
async fn test_find_existing_project() {
    let (server, client) = common::setup_identity_mock().await;
    common::mount_existing_project(&server, "p-123", "azure-prod").await;

    let project = client
        .find_project_by_name("azure-prod")
        .await
        .expect("lookup failed")
        .expect("project should exist");

    assert_eq!(project.id.as_str(), "p-123");
    assert_eq!(project.name, "azure-prod");
}

#[tokio::test]
async fn test_missing_project_is_none() {
    let (server, client) = common::setup_identity_mock().await;
    common::mount_missing_project(&server, "azure-new").await;

    let project = client.find_project_by_name("azure-new").await.unwrap();
    assert!(project.is_none());
}

#[tokio::test]
async fn test_create_project() {
    let (server, client) = common::setup_identity_mock().await;
    Mock::given(method("POST"))
        .and(path("/v3/projects"))
        .and(header("X-Auth-Token", TEST_TOKEN))
        .and(body_json(serde_json::json!({ "project": { "name": "azure-new" } })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "project": { "id": "p-new", "name": "azure-new" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let project = client.create_project("azure-new").await.unwrap();
    assert_eq!(project.id.as_str(), "p-new");
}

#[tokio::test]
async fn test_server_error_is_surfaced() {
    let (server, client) = common::setup_identity_mock().await;
    Mock::given(method("GET"))
        .and(path("/v3/projects/azure-prod"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client.get_project("azure-prod").await.unwrap_err();
    match err {
        IdentityError::Status { status, body, .. } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = client.find_project_by_name("azure-prod").await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let (server, client) = common::setup_identity_mock().await;
    Mock::given(method("POST"))
        .and(path("/v3/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "unexpected": true
        })))
        .mount(&server)
        .await;

    let err = client.post_project("azure-prod").await.unwrap_err();
    assert!(matches!(err, IdentityError::Malformed(_)));
}

#[tokio::test]
async fn test_unreachable_service() {
    let client = cloudmgr_identity::IdentityClient::new("http://127.0.0.1:9/v3", None).unwrap();
    let err = client.get_project("x").await.unwrap_err();
    assert!(matches!(err, IdentityError::Transport { .. }));
}
