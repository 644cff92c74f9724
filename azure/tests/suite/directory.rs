use pretty_assertions::assert_eq;
use serde_json::json;
use tagger_azure::DirectoryClient;
use tagger_core::{ApiError, DirectoryApi};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{authorizer, endpoints};

fn client(server: &MockServer) -> DirectoryClient {
    DirectoryClient::new(
        reqwest::Client::new(),
        &endpoints(server),
        "tenant-a",
        authorizer(),
    )
}

#[tokio::test]
async fn looks_up_service_principal_by_app_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenant-a/servicePrincipals"))
        .and(query_param("$filter", "appId eq 'app-1'"))
        .and(query_param("api-version", "1.6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "odata.metadata": "https://graph.windows.net/tenant-a/$metadata#directoryObjects",
            "value": [{"appId": "app-1", "displayName": "Deploy Pipeline"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let name = client(&server).display_name("app-1").await.unwrap();
    assert_eq!(name, "Deploy Pipeline");
}

#[tokio::test]
async fn no_match_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenant-a/servicePrincipals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&server)
        .await;

    let err = client(&server).display_name("app-1").await.unwrap_err();
    assert_eq!(err, ApiError::NotFound);
}

#[tokio::test]
async fn graph_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenant-a/servicePrincipals"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "odata.error": {"code": "Request_BadRequest", "message": {"lang": "en", "value": "Invalid filter"}}
        })))
        .mount(&server)
        .await;

    let err = client(&server).display_name("app-1").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Status {
            status: 400,
            message: "Invalid filter".to_string(),
        }
    );
}
