//! Build template domain types

use std::fmt;

use serde::Serialize;

use crate::dto::cluster::{
    BUILD_TEMPLATE_API_VERSION, BUILD_TEMPLATE_KIND, BuildTemplateObject, BuildTemplateSpec,
    ContainerSpec, ObjectMeta, ParameterSpec,
};

/// Cluster resource name of a build template
///
/// Always a valid resource name: lowercase ASCII alphanumerics and hyphens,
/// starting and ending with an alphanumeric, at most
/// [`crate::template::MAX_NAME_LEN`] characters. Only the template builder
/// creates identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TemplateIdentity(String);

impl TemplateIdentity {
    pub(crate) fn new_unchecked(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named template parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: &'static str,
    pub description: &'static str,
}

/// One execution container of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub args: Vec<String>,
}

/// A build template ready to be written to the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildTemplate {
    pub identity: TemplateIdentity,
    pub parameters: Vec<Parameter>,
    pub steps: Vec<Container>,
    /// Concurrency token of the remote copy; `None` until the resource has
    /// been observed in the cluster
    pub resource_version: Option<String>,
}

impl BuildTemplate {
    /// Copy of this template carrying the given concurrency token
    pub fn with_resource_version(&self, resource_version: Option<String>) -> Self {
        Self {
            resource_version,
            ..self.clone()
        }
    }

    /// Render the cluster resource body
    pub fn to_object(&self, namespace: &str) -> BuildTemplateObject {
        BuildTemplateObject {
            api_version: BUILD_TEMPLATE_API_VERSION.to_string(),
            kind: BUILD_TEMPLATE_KIND.to_string(),
            metadata: ObjectMeta {
                name: self.identity.as_str().to_string(),
                namespace: Some(namespace.to_string()),
                resource_version: self.resource_version.clone(),
            },
            spec: BuildTemplateSpec {
                parameters: self
                    .parameters
                    .iter()
                    .map(|p| ParameterSpec {
                        name: p.name.to_string(),
                        description: Some(p.description.to_string()),
                    })
                    .collect(),
                steps: self
                    .steps
                    .iter()
                    .map(|c| ContainerSpec {
                        name: c.name.clone(),
                        image: c.image.clone(),
                        args: c.args.clone(),
                    })
                    .collect(),
            },
        }
    }
}
