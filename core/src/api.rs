//! Collaborator interfaces.
//!
//! The scanner only sees these traits; `tagger-azure` implements them over
//! HTTP and [`crate::Throttled`] gates them behind the rate limiter.

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::model::{ChangeEvent, Page, ProviderInfo, Resource, Tags};

/// Management plane: tenants, subscriptions, providers, activity log and
/// generic resource read/write.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Tenant ids reachable by the current credential.
    async fn list_tenants(&self) -> ApiResult<Vec<String>>;

    /// One page of subscription ids. Pass the previous page's `next_link`
    /// to continue.
    async fn list_subscriptions(&self, next_link: Option<&str>) -> ApiResult<Page<String>>;

    /// Every provider namespace and resource type exposed to `subscription`.
    async fn list_providers(&self, subscription: &str) -> ApiResult<Vec<ProviderInfo>>;

    /// One page of change events matching the server-side `filter`.
    async fn list_change_events(
        &self,
        subscription: &str,
        filter: &str,
        next_link: Option<&str>,
    ) -> ApiResult<Page<ChangeEvent>>;

    /// Current state of a resource. Returns [`crate::ApiError::NotFound`]
    /// when the resource no longer exists.
    async fn get_resource(&self, resource_id: &str, api_version: &str) -> ApiResult<Resource>;

    /// Replaces the resource's tag map with `tags`.
    async fn update_tags(&self, resource_id: &str, api_version: &str, tags: &Tags)
    -> ApiResult<()>;
}

/// Directory service used to name application callers.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Display name of the service principal registered for `app_id`.
    async fn display_name(&self, app_id: &str) -> ApiResult<String>;
}

#[async_trait]
impl<T: ManagementApi + ?Sized> ManagementApi for std::sync::Arc<T> {
    async fn list_tenants(&self) -> ApiResult<Vec<String>> {
        (**self).list_tenants().await
    }

    async fn list_subscriptions(&self, next_link: Option<&str>) -> ApiResult<Page<String>> {
        (**self).list_subscriptions(next_link).await
    }

    async fn list_providers(&self, subscription: &str) -> ApiResult<Vec<ProviderInfo>> {
        (**self).list_providers(subscription).await
    }

    async fn list_change_events(
        &self,
        subscription: &str,
        filter: &str,
        next_link: Option<&str>,
    ) -> ApiResult<Page<ChangeEvent>> {
        (**self)
            .list_change_events(subscription, filter, next_link)
            .await
    }

    async fn get_resource(&self, resource_id: &str, api_version: &str) -> ApiResult<Resource> {
        (**self).get_resource(resource_id, api_version).await
    }

    async fn update_tags(
        &self,
        resource_id: &str,
        api_version: &str,
        tags: &Tags,
    ) -> ApiResult<()> {
        (**self).update_tags(resource_id, api_version, tags).await
    }
}

#[async_trait]
impl<T: DirectoryApi + ?Sized> DirectoryApi for std::sync::Arc<T> {
    async fn display_name(&self, app_id: &str) -> ApiResult<String> {
        (**self).display_name(app_id).await
    }
}
