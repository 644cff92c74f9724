//! [`ManagementApi`] over Azure Resource Manager.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tagger_core::{
    ApiResult, ChangeEvent, ManagementApi, Page, ProviderInfo, Resource, ResourceTypeInfo, Tags,
};

use crate::Endpoints;
use crate::auth::Authorizer;
use crate::http::{authorized, read_json, send};

const SUBSCRIPTIONS_API_VERSION: &str = "2020-01-01";
const PROVIDERS_API_VERSION: &str = "2021-04-01";
const ACTIVITY_LOG_API_VERSION: &str = "2015-04-01";

/// Paged list envelope used by every ARM collection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(default)]
    next_link: Option<String>,
}

impl<T> ListResponse<T> {
    fn into_page<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.value.into_iter().map(f).collect(),
            next_link: self.next_link.filter(|link| !link.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantEntry {
    tenant_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionEntry {
    subscription_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderEntry {
    namespace: String,
    #[serde(default)]
    resource_types: Vec<ResourceTypeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceTypeEntry {
    resource_type: String,
    #[serde(default)]
    api_versions: Vec<String>,
}

impl From<ProviderEntry> for ProviderInfo {
    fn from(entry: ProviderEntry) -> Self {
        Self {
            namespace: entry.namespace,
            resource_types: entry
                .resource_types
                .into_iter()
                .map(|ty| ResourceTypeInfo {
                    resource_type: ty.resource_type,
                    api_versions: ty.api_versions,
                })
                .collect(),
        }
    }
}

/// `{"value": "...", "localizedValue": "..."}`
#[derive(Debug, Deserialize)]
struct LocalizableString {
    #[serde(default)]
    value: Option<String>,
}

fn localized(value: Option<LocalizableString>) -> Option<String> {
    value.and_then(|v| v.value).filter(|v| !v.is_empty())
}

/// One activity log entry. Only the fields the scanner reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventData {
    #[serde(default)]
    event_data_id: String,
    #[serde(default)]
    event_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    caller: Option<String>,
    #[serde(default)]
    claims: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    resource_id: Option<String>,
    #[serde(default)]
    resource_type: Option<LocalizableString>,
    #[serde(default)]
    operation_name: Option<LocalizableString>,
    #[serde(default)]
    sub_status: Option<LocalizableString>,
}

impl From<EventData> for ChangeEvent {
    fn from(event: EventData) -> Self {
        let claims = event
            .claims
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect();
        Self {
            event_id: event.event_data_id,
            timestamp: event.event_timestamp,
            caller: event.caller.filter(|c| !c.is_empty()),
            claims,
            resource_id: event.resource_id.filter(|id| !id.is_empty()),
            resource_type: localized(event.resource_type),
            operation_name: localized(event.operation_name),
            sub_status: localized(event.sub_status),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenericResource {
    id: String,
    /// `null` on resources that never had tags.
    #[serde(default)]
    tags: Option<Tags>,
}

/// Resource manager client. Holds no rate limiting of its own; wrap it in
/// [`tagger_core::Throttled`].
pub struct ManagementClient {
    http: reqwest::Client,
    base: String,
    authorizer: Arc<dyn Authorizer>,
}

impl ManagementClient {
    pub fn new(http: reqwest::Client, endpoints: &Endpoints, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            http,
            base: endpoints.resource_manager_base().to_string(),
            authorizer,
        }
    }

    /// `id` is a resource path starting with `/`.
    fn resource_url(&self, id: &str) -> String {
        format!("{}{id}", self.base)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let request = authorized(self.http.get(url).query(query), self.authorizer.as_ref()).await?;
        read_json(send(request).await?).await
    }

    /// Reads every page of a collection.
    async fn get_all<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<Vec<T>> {
        let mut page: ListResponse<T> = self.get_json(url, query).await?;
        let mut items = std::mem::take(&mut page.value);
        while let Some(next_link) = page.next_link.take().filter(|link| !link.is_empty()) {
            page = self.get_json(&next_link, &[]).await?;
            items.append(&mut page.value);
        }
        Ok(items)
    }
}

#[async_trait]
impl ManagementApi for ManagementClient {
    async fn list_tenants(&self) -> ApiResult<Vec<String>> {
        let url = format!("{}/tenants", self.base);
        let tenants: Vec<TenantEntry> = self
            .get_all(&url, &[("api-version", SUBSCRIPTIONS_API_VERSION)])
            .await?;
        Ok(tenants.into_iter().map(|t| t.tenant_id).collect())
    }

    async fn list_subscriptions(&self, next_link: Option<&str>) -> ApiResult<Page<String>> {
        let response: ListResponse<SubscriptionEntry> = match next_link {
            Some(link) => self.get_json(link, &[]).await?,
            None => {
                let url = format!("{}/subscriptions", self.base);
                self.get_json(&url, &[("api-version", SUBSCRIPTIONS_API_VERSION)])
                    .await?
            }
        };
        Ok(response.into_page(|s| s.subscription_id))
    }

    async fn list_providers(&self, subscription: &str) -> ApiResult<Vec<ProviderInfo>> {
        let url = format!("{}/subscriptions/{subscription}/providers", self.base);
        let providers: Vec<ProviderEntry> = self
            .get_all(&url, &[("api-version", PROVIDERS_API_VERSION)])
            .await?;
        Ok(providers.into_iter().map(ProviderInfo::from).collect())
    }

    async fn list_change_events(
        &self,
        subscription: &str,
        filter: &str,
        next_link: Option<&str>,
    ) -> ApiResult<Page<ChangeEvent>> {
        let response: ListResponse<EventData> = match next_link {
            Some(link) => self.get_json(link, &[]).await?,
            None => {
                let url = format!(
                    "{}/subscriptions/{subscription}/providers/microsoft.insights/eventtypes/management/values",
                    self.base
                );
                self.get_json(
                    &url,
                    &[("api-version", ACTIVITY_LOG_API_VERSION), ("$filter", filter)],
                )
                .await?
            }
        };
        Ok(response.into_page(ChangeEvent::from))
    }

    async fn get_resource(&self, resource_id: &str, api_version: &str) -> ApiResult<Resource> {
        let resource: GenericResource = self
            .get_json(
                &self.resource_url(resource_id),
                &[("api-version", api_version)],
            )
            .await?;
        Ok(Resource {
            id: resource.id,
            tags: resource.tags.unwrap_or_default(),
        })
    }

    async fn update_tags(&self, resource_id: &str, api_version: &str, tags: &Tags) -> ApiResult<()> {
        let request = self
            .http
            .patch(self.resource_url(resource_id))
            .query(&[("api-version", api_version)])
            .json(&json!({ "tags": tags }));
        send(authorized(request, self.authorizer.as_ref()).await?).await?;
        Ok(())
    }
}
