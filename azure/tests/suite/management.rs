use pretty_assertions::assert_eq;
use serde_json::json;
use tagger_azure::ManagementClient;
use tagger_core::bootstrap::list_all_subscriptions;
use tagger_core::{ApiError, ManagementApi, Tags};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{TOKEN, authorizer, endpoints};

const STORAGE_ID: &str =
    "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Storage/storageAccounts/sa1";

fn client(server: &MockServer) -> ManagementClient {
    ManagementClient::new(reqwest::Client::new(), &endpoints(server), authorizer())
}

#[tokio::test]
async fn lists_tenants_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenants"))
        .and(query_param("api-version", "2020-01-01"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"tenantId": "tenant-a"}, {"tenantId": "tenant-b"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tenants = client(&server).list_tenants().await.unwrap();
    assert_eq!(tenants, vec!["tenant-a", "tenant-b"]);
}

#[tokio::test]
async fn follows_subscription_next_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .and(query_param("api-version", "2020-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"subscriptionId": "sub-1"}, {"subscriptionId": "sub-2"}],
            "nextLink": format!("{}/subscriptions-page-2?api-version=2020-01-01", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subscriptions-page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"subscriptionId": "sub-3"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let subscriptions = list_all_subscriptions(&client(&server)).await.unwrap();
    assert_eq!(subscriptions, vec!["sub-1", "sub-2", "sub-3"]);
}

#[tokio::test]
async fn provider_listing_reads_every_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/providers"))
        .and(query_param("api-version", "2021-04-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "namespace": "Microsoft.Storage",
                "resourceTypes": [{"resourceType": "storageAccounts", "apiVersions": ["2023-05-01", "2022-09-01"]}]
            }],
            "nextLink": format!("{}/providers-page-2", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/providers-page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"namespace": "Microsoft.Web", "resourceTypes": []}]
        })))
        .mount(&server)
        .await;

    let providers = client(&server).list_providers("sub-1").await.unwrap();
    let namespaces: Vec<&str> = providers.iter().map(|p| p.namespace.as_str()).collect();
    assert_eq!(namespaces, vec!["Microsoft.Storage", "Microsoft.Web"]);
    assert_eq!(
        providers[0].resource_types[0].api_versions,
        vec!["2023-05-01", "2022-09-01"]
    );
}

#[tokio::test]
async fn change_events_carry_the_window_filter() {
    let server = MockServer::start().await;
    let filter =
        "eventTimestamp ge '2024-03-01T09:00:00' and eventTimestamp le '2024-03-01T10:00:00'";
    Mock::given(method("GET"))
        .and(path(
            "/subscriptions/sub-1/providers/microsoft.insights/eventtypes/management/values",
        ))
        .and(query_param("api-version", "2015-04-01"))
        .and(query_param("$filter", filter))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "eventDataId": "e-1",
                "caller": "alice@example.com",
                "claims": {"name": "Alice"},
                "resourceId": STORAGE_ID,
                "resourceType": {"value": "Microsoft.Storage/storageAccounts"},
                "operationName": {"value": "Microsoft.Storage/storageAccounts/write"},
                "subStatus": {"value": "Created"}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .list_change_events("sub-1", filter, None)
        .await
        .unwrap();
    assert_eq!(page.next_link, None);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].resource_id.as_deref(), Some(STORAGE_ID));
}

#[tokio::test]
async fn reads_resource_with_requested_api_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STORAGE_ID))
        .and(query_param("api-version", "2023-05-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": STORAGE_ID,
            "name": "sa1",
            "tags": {"env": "prod"}
        })))
        .mount(&server)
        .await;

    let resource = client(&server)
        .get_resource(STORAGE_ID, "2023-05-01")
        .await
        .unwrap();
    assert_eq!(resource.id, STORAGE_ID);
    assert_eq!(resource.tags.get("env").map(String::as_str), Some("prod"));
}

#[tokio::test]
async fn missing_resource_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STORAGE_ID))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "ResourceNotFound", "message": "gone"}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_resource(STORAGE_ID, "2023-05-01")
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotFound);
}

#[tokio::test]
async fn forbidden_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenants"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "AuthorizationFailed", "message": "no access"}
        })))
        .mount(&server)
        .await;

    let err = client(&server).list_tenants().await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Unauthorized("AuthorizationFailed: no access".to_string())
    );
}

#[tokio::test]
async fn tag_update_patches_the_full_tag_set() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(STORAGE_ID))
        .and(query_param("api-version", "2023-05-01"))
        .and(body_json(json!({
            "tags": {
                "Created-by": "Alice",
                "Created-by-id": "alice@example.com",
                "env": "prod"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": STORAGE_ID})))
        .expect(1)
        .mount(&server)
        .await;

    let tags: Tags = [
        ("env", "prod"),
        ("Created-by", "Alice"),
        ("Created-by-id", "alice@example.com"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    client(&server)
        .update_tags(STORAGE_ID, "2023-05-01", &tags)
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_tag_update_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(STORAGE_ID))
        .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
        .mount(&server)
        .await;

    let err = client(&server)
        .update_tags(STORAGE_ID, "2023-05-01", &Tags::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::Status {
            status: 409,
            message: "conflict".to_string(),
        }
    );
}
