//! Resource type → API version lookup.

use std::collections::HashMap;

use crate::model::ProviderInfo;

/// Immutable map from lower-cased `namespace/type` to the API version used
/// to read and write resources of that type. Built once at startup and
/// shared read-only between scans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCatalog {
    versions: HashMap<String, String>,
}

impl ProviderCatalog {
    /// Keeps the first listed API version of every type. Types without any
    /// listed version are left out.
    pub fn from_providers(providers: &[ProviderInfo]) -> Self {
        let versions = providers
            .iter()
            .flat_map(|provider| {
                provider.resource_types.iter().filter_map(move |ty| {
                    let version = ty.api_versions.first()?;
                    let key = format!("{}/{}", provider.namespace, ty.resource_type).to_lowercase();
                    Some((key, version.clone()))
                })
            })
            .collect();
        Self { versions }
    }

    /// Case-insensitive lookup by `namespace/type`.
    pub fn api_version(&self, resource_type: &str) -> Option<&str> {
        self.versions
            .get(&resource_type.to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl FromIterator<(String, String)> for ProviderCatalog {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let versions = iter
            .into_iter()
            .map(|(ty, version)| (ty.to_lowercase(), version))
            .collect();
        Self { versions }
    }
}
