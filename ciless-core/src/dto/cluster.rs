//! Cluster build-template resource
//!
//! Mirrors the `build.knative.dev/v1alpha1` `BuildTemplate` object. Fields
//! the bridge does not manage (labels, container env, status, ...) are
//! dropped when reading.

use serde::{Deserialize, Serialize};

pub const BUILD_TEMPLATE_GROUP: &str = "build.knative.dev";
pub const BUILD_TEMPLATE_VERSION: &str = "v1alpha1";
pub const BUILD_TEMPLATE_API_VERSION: &str = "build.knative.dev/v1alpha1";
pub const BUILD_TEMPLATE_KIND: &str = "BuildTemplate";
/// Plural resource segment used in API paths
pub const BUILD_TEMPLATE_RESOURCE: &str = "buildtemplates";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTemplateObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: BuildTemplateSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTemplateSpec {
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub steps: Vec<ContainerSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// `Status` object returned by the cluster API on failed requests
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub message: Option<String>,
}
