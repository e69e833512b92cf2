//! Cluster build-template API

use ciless_core::dto::cluster::{
    ApiStatus, BUILD_TEMPLATE_GROUP, BUILD_TEMPLATE_RESOURCE, BUILD_TEMPLATE_VERSION,
    BuildTemplateObject,
};
use reqwest::{Client, RequestBuilder};

use crate::error::{ClientError, Result};
use crate::{USER_AGENT, handle_response, trim_base_url};

/// Client for build templates in a single namespace
#[derive(Clone)]
pub struct ClusterClient {
    /// Base URL of the cluster API server (e.g., "https://kubernetes.default.svc")
    base_url: String,
    /// Namespace all templates are read from and written to
    namespace: String,
    /// Optional bearer token (service account or user token)
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl ClusterClient {
    /// Create a new client with a default HTTP client
    pub fn new(base_url: impl Into<String>, namespace: impl Into<String>) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(base_url, namespace, client))
    }

    /// Create a new client with a custom HTTP client
    ///
    /// Use this to add the cluster CA bundle or a request timeout.
    pub fn with_client(
        base_url: impl Into<String>,
        namespace: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            namespace: namespace.into(),
            token: None,
            client,
        }
    }

    /// Authenticate every request with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the API server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the namespace this client writes to
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/apis/{}/{}/namespaces/{}/{}",
            self.base_url,
            BUILD_TEMPLATE_GROUP,
            BUILD_TEMPLATE_VERSION,
            self.namespace,
            BUILD_TEMPLATE_RESOURCE
        )
    }

    fn resource_url(&self, name: &str) -> String {
        format!("{}/{}", self.collection_url(), name)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =============================================================================
    // Build Templates
    // =============================================================================

    /// Get a build template by name
    ///
    /// # Returns
    /// The stored template, or [`ClientError::NotFound`]
    pub async fn get_build_template(&self, name: &str) -> Result<BuildTemplateObject> {
        let url = self.resource_url(name);
        let response = self.authorize(self.client.get(&url)).send().await?;

        handle_response(response, name).await
    }

    /// Create a build template
    ///
    /// # Returns
    /// The stored template, or [`ClientError::AlreadyExists`] when another
    /// writer created it first
    pub async fn create_build_template(
        &self,
        template: &BuildTemplateObject,
    ) -> Result<BuildTemplateObject> {
        let url = self.collection_url();
        let response = self
            .authorize(self.client.post(&url))
            .json(template)
            .send()
            .await?;

        handle_response(response, &template.metadata.name)
            .await
            .map_err(|e| conflict_as(e, ClientError::AlreadyExists))
    }

    /// Replace a build template
    ///
    /// The body must carry the resource version last read from the cluster.
    ///
    /// # Returns
    /// The stored template, or [`ClientError::Conflict`] when the resource
    /// version is stale
    pub async fn replace_build_template(
        &self,
        template: &BuildTemplateObject,
    ) -> Result<BuildTemplateObject> {
        let url = self.resource_url(&template.metadata.name);
        let response = self
            .authorize(self.client.put(&url))
            .json(template)
            .send()
            .await?;

        handle_response(response, &template.metadata.name)
            .await
            .map_err(|e| conflict_as(e, ClientError::Conflict))
    }
}

impl std::fmt::Debug for ClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterClient")
            .field("base_url", &self.base_url)
            .field("namespace", &self.namespace)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

/// Turn a 409 response into the operation-specific error
fn conflict_as(err: ClientError, make: fn(String) -> ClientError) -> ClientError {
    match err {
        ClientError::ApiError {
            status: 409,
            message,
        } => {
            let status: ApiStatus = serde_json::from_str(&message).unwrap_or_default();
            make(status.message.unwrap_or(message))
        }
        other => other,
    }
}
