//! Build specification domain types

use std::collections::HashSet;

use serde::Serialize;

use crate::decode::DecodeError;

/// A single step of a repository's build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStep {
    pub name: String,
    pub image: String,
    pub args: Vec<String>,
}

impl BuildStep {
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered list of build steps decoded from a repository's config file
///
/// Step order is execution order downstream. A `BuildSpec` can only be
/// obtained through [`BuildSpec::new`], which enforces that the list is
/// non-empty and that every step has a unique, non-empty name and a
/// non-empty image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSpec {
    steps: Vec<BuildStep>,
}

impl BuildSpec {
    pub fn new(steps: Vec<BuildStep>) -> Result<Self, DecodeError> {
        if steps.is_empty() {
            return Err(DecodeError::EmptySteps);
        }

        let mut seen = HashSet::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(DecodeError::MissingField {
                    index,
                    field: "name",
                });
            }
            if step.image.trim().is_empty() {
                return Err(DecodeError::MissingField {
                    index,
                    field: "image",
                });
            }
            if !seen.insert(step.name.as_str()) {
                return Err(DecodeError::DuplicateStep(step.name.clone()));
            }
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
