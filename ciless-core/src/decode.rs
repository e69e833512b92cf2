//! Config decoder
//!
//! Turns the raw bytes of a repository's config file into a validated
//! [`BuildSpec`].

use thiserror::Error;

use crate::domain::build::{BuildSpec, BuildStep};
use crate::dto::config::ConfigFile;

/// Well-known path of the config file inside a repository
pub const CONFIG_FILE_PATH: &str = ".ciless.yaml";

/// Reasons a config file is rejected
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed config file: {0}")]
    Malformed(#[from] serde_yaml::Error),

    #[error("config file declares no steps")]
    EmptySteps,

    #[error("step {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("duplicate step name `{0}`")]
    DuplicateStep(String),
}

/// Decode a config file
///
/// Unknown fields are rejected at every level, so a misspelled key such as
/// `arg:` fails loudly instead of silently producing a step without
/// arguments.
pub fn decode(bytes: &[u8]) -> Result<BuildSpec, DecodeError> {
    let file: ConfigFile = serde_yaml::from_slice(bytes)?;

    let steps = file
        .steps
        .into_iter()
        .map(|step| BuildStep {
            name: step.name,
            image: step.image,
            args: step.args,
        })
        .collect();

    BuildSpec::new(steps)
}
