//! Template builder
//!
//! Derives the cluster build template for a (repository, ref, spec) triple.
//! Building is pure: the same inputs always produce the same template.

use sha2::{Digest, Sha256};

use crate::domain::build::BuildSpec;
use crate::domain::template::{BuildTemplate, Container, Parameter, TemplateIdentity};

/// Prefix every template name starts with unless configured otherwise
pub const DEFAULT_TEMPLATE_PREFIX: &str = "knative-ci-";

/// Upper bound on template names (DNS-1123 label length)
pub const MAX_NAME_LEN: usize = 63;

/// Hex characters of the disambiguating digest appended to rewritten names
const DIGEST_LEN: usize = 8;

/// Parameters attached to every template, in order
pub const TEMPLATE_PARAMETERS: [Parameter; 3] = [
    Parameter {
        name: "REPO_DIR",
        description: "Local directory path to checked out repository",
    },
    Parameter {
        name: "USER_REPO_SLUG",
        description: "<username>/<repository_name>",
    },
    Parameter {
        name: "COMMIT_REF",
        description: "Git REF for the current change",
    },
];

/// Builds build templates with a fixed name prefix
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    prefix: String,
}

impl TemplateBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Derive the template name for a repository slug and ref
    ///
    /// The readable form is `prefix + owner + "-" + repo + "-ref-" + ref`,
    /// with the slug lowercased since repository names are case-insensitive.
    /// It is used as-is only when it reads back unambiguously, meaning no
    /// hyphen in owner or repo and nothing sanitized away or over length.
    /// Any other name is cut down and suffixed with a digest of the exact
    /// slug and ref, so `org/app-ci` and `org-app/ci` never share a name.
    pub fn identity(&self, repo_slug: &str, git_ref: &str) -> TemplateIdentity {
        let slug = repo_slug.to_ascii_lowercase();
        let raw = format!("{}{}-ref-{}", self.prefix, slug.replacen('/', "-", 1), git_ref);

        let sanitized = sanitize(&raw);
        if sanitized == raw && sanitized.len() <= MAX_NAME_LEN && slug_is_unambiguous(&slug) {
            return TemplateIdentity::new_unchecked(sanitized);
        }

        // Newline cannot occur in a slug, so the hashed input is unambiguous
        let digest = hex::encode(Sha256::digest(format!("{slug}\n{git_ref}").as_bytes()));
        let digest = &digest[..DIGEST_LEN];

        let mut stem = sanitized;
        stem.truncate(MAX_NAME_LEN - DIGEST_LEN - 1);
        let stem = stem.trim_end_matches('-');

        if stem.is_empty() {
            TemplateIdentity::new_unchecked(digest.to_string())
        } else {
            TemplateIdentity::new_unchecked(format!("{stem}-{digest}"))
        }
    }

    /// Build the template for a decoded spec
    pub fn build(&self, repo_slug: &str, git_ref: &str, spec: &BuildSpec) -> BuildTemplate {
        BuildTemplate {
            identity: self.identity(repo_slug, git_ref),
            parameters: TEMPLATE_PARAMETERS.to_vec(),
            steps: spec
                .steps()
                .iter()
                .map(|step| Container {
                    name: step.name.clone(),
                    image: step.image.clone(),
                    args: step.args.clone(),
                })
                .collect(),
            resource_version: None,
        }
    }
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE_PREFIX)
    }
}

/// Lowercase, map everything outside `[a-z0-9-]` to `-` and strip leading
/// and trailing hyphens. The output is pure ASCII.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

/// `owner/repo` with no hyphen on either side, so the hyphen-joined form
/// splits back into exactly one slug
fn slug_is_unambiguous(slug: &str) -> bool {
    match slug.split_once('/') {
        Some((owner, repo)) => {
            !owner.is_empty() && !repo.is_empty() && !owner.contains('-') && !repo.contains('-')
        }
        None => false,
    }
}
