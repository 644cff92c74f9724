//! HTTP implementations of the `tagger-core` collaborator traits against
//! Azure Resource Manager, the Activity Log and the Graph directory, plus
//! credential acquisition.

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod auth;
mod directory;
mod http;
mod management;

pub use auth::{
    AccessToken, AuthError, Authorizer, AzureCliAuthorizer, CachedAuthorizer,
    ClientSecretAuthorizer, ClientSecretCredential, CredentialSource, parse_cli_token,
};
pub use directory::DirectoryClient;
pub use management::ManagementClient;

pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.windows.net";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Base URLs of the cloud being targeted, stored without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    resource_manager: String,
    graph: String,
    authority_host: String,
}

impl Endpoints {
    pub fn new(resource_manager: &str, graph: &str, authority_host: &str) -> Self {
        Self {
            resource_manager: trim_base(resource_manager),
            graph: trim_base(graph),
            authority_host: trim_base(authority_host),
        }
    }

    /// Resource manager base. Also the token audience for management calls.
    pub fn resource_manager_base(&self) -> &str {
        &self.resource_manager
    }

    /// Graph base. Also the token audience for directory calls.
    pub fn graph_base(&self) -> &str {
        &self.graph
    }

    pub fn authority_base(&self) -> &str {
        &self.authority_host
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(
            DEFAULT_RESOURCE_MANAGER_ENDPOINT,
            DEFAULT_GRAPH_ENDPOINT,
            DEFAULT_AUTHORITY_HOST,
        )
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
