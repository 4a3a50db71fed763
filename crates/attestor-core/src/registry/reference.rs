//! Image name normalization for registry lookups.
//!
//! Turns references like `ghcr.io/acme/app:1.2`, `nginx` or
//! `app@sha256:<hex>` into the repository path and manifest reference the
//! registry API expects.

use crate::constants::{DEFAULT_PROVIDER, DEFAULT_TAG};
use crate::error::{FingerprintError, Result};

use super::endpoint::{RegistryEndpoint, KNOWN_PROVIDERS};

/// Repository path plus the tag or digest whose manifest is wanted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageName {
    /// Repository path without registry host (e.g., "library/nginx").
    pub repository: String,
    /// Tag (e.g., "latest") or digest (e.g., "sha256:abc...").
    pub reference: String,
}

impl ImageName {
    pub fn parse(image: &str, endpoint: &RegistryEndpoint) -> Result<Self> {
        let image = image.trim();
        if image.is_empty() {
            return Err(FingerprintError::validation("empty image reference"));
        }

        let (name, reference) = match image.split_once('@') {
            Some((name_tag, digest)) => {
                if !digest.contains(':') {
                    return Err(FingerprintError::validation(format!(
                        "invalid digest in image reference '{image}': expected algorithm:hex"
                    )));
                }
                let (name, _) = split_tag(name_tag);
                (name, digest.to_string())
            }
            None => {
                let (name, tag) = split_tag(image);
                (name, tag.unwrap_or(DEFAULT_TAG).to_string())
            }
        };

        if reference.is_empty() {
            return Err(FingerprintError::validation(format!(
                "empty tag in image reference '{image}'"
            )));
        }

        let (_, repository) = split_host(name);
        let repository = match endpoint.implicit_namespace {
            Some(namespace) if !repository.contains('/') => format!("{namespace}/{repository}"),
            _ => repository.to_string(),
        };

        if repository.is_empty() || repository.ends_with('/') {
            return Err(FingerprintError::validation(format!(
                "empty repository in image reference '{image}'"
            )));
        }

        Ok(Self {
            repository,
            reference,
        })
    }
}

/// Picks the provider for an image reference from its registry host.
pub fn provider_for_image(image: &str) -> String {
    let name = image.split('@').next().unwrap_or_default();
    match split_host(name.trim()) {
        (None, _) => DEFAULT_PROVIDER.to_string(),
        (Some(host), _) => KNOWN_PROVIDERS
            .iter()
            .find(|p| p.hosts.contains(&host))
            .map(|p| p.name.to_string())
            .unwrap_or_else(|| host.to_string()),
    }
}

/// Splits `name:tag`; a colon before the last `/` is a port, not a tag.
fn split_tag(name_tag: &str) -> (&str, Option<&str>) {
    let last_segment_start = name_tag.rfind('/').map_or(0, |pos| pos + 1);
    match name_tag[last_segment_start..].rfind(':') {
        Some(colon) => {
            let colon = last_segment_start + colon;
            (&name_tag[..colon], Some(&name_tag[colon + 1..]))
        }
        None => (name_tag, None),
    }
}

/// Splits off a registry-host-looking first segment.
fn split_host(name: &str) -> (Option<&str>, &str) {
    if let Some((first, rest)) = name.split_once('/') {
        if first.contains('.') || first.contains(':') || first == "localhost" {
            return (Some(first), rest);
        }
    }
    (None, name)
}
