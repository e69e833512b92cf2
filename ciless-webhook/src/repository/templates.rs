//! Build template repository
//!
//! Get, create and replace build templates by name in one namespace.

use async_trait::async_trait;
use ciless_client::ClusterClient;
use ciless_core::domain::template::BuildTemplate;
use ciless_core::dto::cluster::BuildTemplateObject;

use super::RepositoryError;

/// Repository trait for build templates stored in the cluster
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Fetches the stored template, or [`RepositoryError::NotFound`]
    async fn get(&self, name: &str) -> Result<BuildTemplateObject, RepositoryError>;

    /// Stores a new template
    ///
    /// Fails with [`RepositoryError::AlreadyExists`] if the name is taken.
    async fn create(&self, template: &BuildTemplate)
    -> Result<BuildTemplateObject, RepositoryError>;

    /// Replaces a stored template
    ///
    /// `template.resource_version` must match the stored version, otherwise
    /// the call fails with [`RepositoryError::Conflict`].
    async fn update(&self, template: &BuildTemplate)
    -> Result<BuildTemplateObject, RepositoryError>;
}

/// Cluster API implementation of TemplateRepository
pub struct ClusterTemplateRepository {
    client: ClusterClient,
}

impl ClusterTemplateRepository {
    pub fn new(client: ClusterClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TemplateRepository for ClusterTemplateRepository {
    async fn get(&self, name: &str) -> Result<BuildTemplateObject, RepositoryError> {
        Ok(self.client.get_build_template(name).await?)
    }

    async fn create(
        &self,
        template: &BuildTemplate,
    ) -> Result<BuildTemplateObject, RepositoryError> {
        let object = template.to_object(self.client.namespace());
        Ok(self.client.create_build_template(&object).await?)
    }

    async fn update(
        &self,
        template: &BuildTemplate,
    ) -> Result<BuildTemplateObject, RepositoryError> {
        let object = template.to_object(self.client.namespace());
        Ok(self.client.replace_build_template(&object).await?)
    }
}
