use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use crate::digest::{validate_fingerprint, Fingerprint};
use crate::error::{FingerprintError, Result};
use crate::registry::reference::provider_for_image;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactType {
    File,
    Dir,
    Docker,
    Oci,
}

impl ArtifactType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Dir => "dir",
            Self::Docker => "docker",
            Self::Oci => "oci",
        }
    }
}

impl Display for ArtifactType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactType {
    type Err = FingerprintError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "file" => Ok(Self::File),
            "dir" => Ok(Self::Dir),
            "docker" => Ok(Self::Docker),
            "oci" => Ok(Self::Oci),
            other => Err(FingerprintError::validation(format!(
                "unknown artifact type '{other}' (supported: file,dir,docker,oci)"
            ))),
        }
    }
}

/// Username/password pair for a container registry.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The artifact a fingerprint is computed for. Exactly one variant is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocator {
    File(PathBuf),
    Directory {
        path: PathBuf,
        excludes: Vec<String>,
    },
    LocalImage(String),
    RemoteImage {
        image: String,
        provider: String,
        credentials: Option<Credentials>,
    },
}

impl Display for ArtifactLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "file '{}'", path.display()),
            Self::Directory { path, .. } => write!(f, "directory '{}'", path.display()),
            Self::LocalImage(image) => write!(f, "docker image '{image}'"),
            Self::RemoteImage {
                image, provider, ..
            } => write!(f, "image '{image}' in registry '{provider}'"),
        }
    }
}

/// Flag-shaped input from the command layer, before cross-field validation.
#[derive(Debug, Clone, Default)]
pub struct FingerprintRequest {
    pub artifact_type: Option<ArtifactType>,
    pub name: String,
    pub sha256: Option<String>,
    pub registry_provider: Option<String>,
    pub registry_username: Option<String>,
    pub registry_password: Option<String>,
    pub excludes: Vec<String>,
}

/// What a validated request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A caller-asserted fingerprint; nothing to compute.
    Known(Fingerprint),
    Compute(ArtifactLocator),
}

impl FingerprintRequest {
    /// Enforces the cross-field rules and builds the locator. Performs no I/O.
    pub fn validate(&self) -> Result<Resolution> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FingerprintError::validation("artifact name must not be empty"));
        }

        let provider = non_empty(&self.registry_provider);
        let username = non_empty(&self.registry_username);
        let password = non_empty(&self.registry_password);

        let credentials = match (username, password) {
            (Some(u), Some(p)) => Some(Credentials::new(u, p)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(FingerprintError::validation(
                    "--registry-username requires --registry-password",
                ))
            }
            (None, Some(_)) => {
                return Err(FingerprintError::validation(
                    "--registry-password requires --registry-username",
                ))
            }
        };

        if let Some(sha256) = &self.sha256 {
            if provider.is_some() || credentials.is_some() {
                return Err(FingerprintError::validation(
                    "--sha256 cannot be combined with registry flags",
                ));
            }
            return validate_fingerprint(sha256).map(Resolution::Known);
        }

        let artifact_type = self.artifact_type.ok_or_else(|| {
            FingerprintError::validation("--artifact-type is required unless --sha256 is given")
        })?;

        let registry_flags_allowed = matches!(artifact_type, ArtifactType::Docker | ArtifactType::Oci);
        if !registry_flags_allowed && (provider.is_some() || credentials.is_some()) {
            return Err(FingerprintError::validation(format!(
                "registry flags are only valid with --artifact-type docker or oci, not '{artifact_type}'"
            )));
        }
        if artifact_type == ArtifactType::Docker && credentials.is_some() && provider.is_none() {
            return Err(FingerprintError::validation(
                "registry credentials require --registry-provider",
            ));
        }
        if !self.excludes.is_empty() && artifact_type != ArtifactType::Dir {
            return Err(FingerprintError::validation(format!(
                "--exclude is only valid with --artifact-type dir, not '{artifact_type}'"
            )));
        }

        let locator = match artifact_type {
            ArtifactType::File => ArtifactLocator::File(PathBuf::from(name)),
            ArtifactType::Dir => ArtifactLocator::Directory {
                path: PathBuf::from(name),
                excludes: self.excludes.clone(),
            },
            ArtifactType::Docker => match provider {
                Some(provider) => ArtifactLocator::RemoteImage {
                    image: name.to_string(),
                    provider: provider.to_string(),
                    credentials,
                },
                None => ArtifactLocator::LocalImage(name.to_string()),
            },
            ArtifactType::Oci => ArtifactLocator::RemoteImage {
                image: name.to_string(),
                provider: provider
                    .map(str::to_string)
                    .unwrap_or_else(|| provider_for_image(name)),
                credentials,
            },
        };

        Ok(Resolution::Compute(locator))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
