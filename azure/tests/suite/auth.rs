use pretty_assertions::assert_eq;
use serde_json::json;
use tagger_azure::{AuthError, Authorizer, CachedAuthorizer, ClientSecretAuthorizer, ClientSecretCredential};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credential(server: &MockServer) -> ClientSecretCredential {
    ClientSecretCredential {
        tenant_id: "tenant-a".to_string(),
        client_id: "app-1".to_string(),
        client_secret: "s3cret".to_string(),
        authority_host: server.uri(),
    }
}

#[tokio::test]
async fn client_credentials_flow_requests_audience_scope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant-a/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=app-1"))
        .and(body_string_contains("client_secret=s3cret"))
        .and(body_string_contains(
            "scope=https%3A%2F%2Fmanagement.azure.com%2F.default",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "arm-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let authorizer = CachedAuthorizer::new(ClientSecretAuthorizer::new(
        reqwest::Client::new(),
        credential(&server),
        "https://management.azure.com/",
    ));
    assert_eq!(authorizer.token().await.unwrap().token, "arm-token");
    // Served from the cache; the mock expects exactly one request.
    assert_eq!(authorizer.token().await.unwrap().token, "arm-token");
}

#[tokio::test]
async fn rejected_credentials_surface_oauth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant-a/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&server)
        .await;

    let authorizer = ClientSecretAuthorizer::new(
        reqwest::Client::new(),
        credential(&server),
        "https://graph.windows.net",
    );
    let err = authorizer.token().await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::OAuth { ref error, .. } if error == "invalid_client"
    ));
}
