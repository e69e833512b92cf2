//! Repository config file format
//!
//! The file lives at `.ciless.yaml` in the root of the repository:
//!
//! ```yaml
//! steps:
//!   - name: build
//!     image: golang:1.20
//!     args: ["go", "build", "./..."]
//! ```

use serde::Deserialize;

/// Top-level document of the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub steps: Vec<ConfigStep>,
}

/// One entry of the `steps` list
///
/// `name` and `image` default to empty so the decoder can report which
/// step is missing them instead of a bare serde message.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigStep {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub args: Vec<String>,
}
