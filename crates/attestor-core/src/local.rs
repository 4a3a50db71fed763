//! Fingerprints for artifacts that live on this host: single files and images
//! held by the local container engine.

use std::io;
use std::path::Path;
use std::process::Command;

use tracing::{debug, instrument};

use crate::digest::{sha256_file, Fingerprint};
use crate::error::{FingerprintError, Result};

/// SHA-256 of a regular file's bytes, independent of its name.
#[instrument]
pub fn hash_file(path: &Path) -> Result<Fingerprint> {
    let meta = std::fs::metadata(path).map_err(|e| FingerprintError::from_io(path, "file", e))?;
    if meta.is_dir() {
        return Err(FingerprintError::NotFound {
            artifact: "file".to_string(),
            reason: format!("'{}' is a directory, use --artifact-type dir", path.display()),
        });
    }
    sha256_file(path)
}

/// Stderr fragments the engine prints when the image is absent.
const MISSING_IMAGE_MARKERS: &[&str] = &["no such image", "no such object", "image not known"];

/// Queries a docker-compatible engine CLI for image identities.
#[derive(Debug, Clone)]
pub struct ContainerEngine {
    binary: String,
}

impl ContainerEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Returns the engine's content-addressable image ID as bare hex.
    #[instrument(skip(self), fields(engine = %self.binary))]
    pub fn image_id(&self, image: &str) -> Result<Fingerprint> {
        let output = Command::new(&self.binary)
            .args(["image", "inspect", "--format", "{{.Id}}", image])
            .output()
            .map_err(|e| self.unavailable(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lowered = stderr.to_lowercase();
            if MISSING_IMAGE_MARKERS.iter().any(|m| lowered.contains(m)) {
                return Err(FingerprintError::NotFound {
                    artifact: format!("docker image '{image}'"),
                    reason: "image is not present in the local engine".to_string(),
                });
            }
            return Err(FingerprintError::EngineUnavailable {
                engine: self.binary.clone(),
                message: format!(
                    "image inspect exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("engine reported id {}", stdout.trim());
        Fingerprint::from_prefixed(&stdout).map_err(|_| FingerprintError::EngineUnavailable {
            engine: self.binary.clone(),
            message: format!("unexpected image id '{}' for '{image}'", stdout.trim()),
        })
    }

    fn unavailable(&self, err: io::Error) -> FingerprintError {
        let message = if err.kind() == io::ErrorKind::NotFound {
            format!("'{}' was not found on PATH", self.binary)
        } else {
            format!("failed to start '{}': {err}", self.binary)
        };
        FingerprintError::EngineUnavailable {
            engine: self.binary.clone(),
            message,
        }
    }
}
