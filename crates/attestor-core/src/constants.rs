//! Constants used across the Attestor workspace.

/// The filename for Attestor's optional configuration.
pub const CONFIG_FILE: &str = "attestor.toml";

/// Ignore file read from the root of a hashed directory.
pub const IGNORE_FILE: &str = ".attestor_ignore";

/// Container engine CLI used for local images.
pub const DEFAULT_ENGINE: &str = "docker";

/// Tag applied to image names that carry none.
pub const DEFAULT_TAG: &str = "latest";

/// Namespace the public registry prepends to unqualified image names.
pub const DEFAULT_NAMESPACE: &str = "library";

/// Provider used when an image reference names no registry host.
pub const DEFAULT_PROVIDER: &str = "dockerhub";

/// Header carrying the manifest digest on registry responses.
pub const CONTENT_DIGEST_HEADER: &str = "Docker-Content-Digest";

/// Manifest and manifest-list media types accepted from registries.
pub const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.list.v2+json, \
application/vnd.docker.distribution.manifest.v2+json, \
application/vnd.oci.image.index.v1+json, \
application/vnd.oci.image.manifest.v1+json";

/// Environment variables consulted for registry credentials.
pub const ENV_REGISTRY_USERNAME: &str = "ATTESTOR_REGISTRY_USERNAME";
pub const ENV_REGISTRY_PASSWORD: &str = "ATTESTOR_REGISTRY_PASSWORD";

pub const USER_AGENT: &str = concat!("attestor/", env!("CARGO_PKG_VERSION"));
