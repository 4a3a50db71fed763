use tracing::{debug, info, instrument};

use crate::artifact::{ArtifactLocator, FingerprintRequest, Resolution};
use crate::config::AttestorConfig;
use crate::digest::Fingerprint;
use crate::error::Result;
use crate::ignore::IgnoreRuleSet;
use crate::local::{hash_file, ContainerEngine};
use crate::registry::RegistryResolver;
use crate::tree::TreeHasher;

/// Single entry point computing an artifact's fingerprint.
///
/// The same artifact always yields the same fingerprint, wherever it is
/// computed. Nothing is cached between calls: every call recomputes from the
/// artifact's current content.
pub struct Fingerprinter {
    tree: TreeHasher,
    ignore_file: String,
    engine: ContainerEngine,
    registry: RegistryResolver,
}

impl Fingerprinter {
    pub fn new(config: &AttestorConfig) -> Self {
        Self {
            tree: TreeHasher::new(config.tree.parallel),
            ignore_file: config.tree.ignore_file.clone(),
            engine: ContainerEngine::new(config.engine.binary.clone()),
            registry: RegistryResolver::new(&config.registry),
        }
    }

    /// Validates `request` before any I/O, then returns the asserted or
    /// computed fingerprint.
    pub fn resolve(&self, request: &FingerprintRequest) -> Result<Fingerprint> {
        match request.validate()? {
            Resolution::Known(fingerprint) => {
                debug!("using supplied fingerprint for '{}'", request.name);
                Ok(fingerprint)
            }
            Resolution::Compute(locator) => self.fingerprint(&locator),
        }
    }

    #[instrument(skip(self, locator), fields(artifact = %locator))]
    pub fn fingerprint(&self, locator: &ArtifactLocator) -> Result<Fingerprint> {
        let fingerprint = match locator {
            ArtifactLocator::File(path) => hash_file(path)?,
            ArtifactLocator::Directory { path, excludes } => {
                let rules = IgnoreRuleSet::load(path, &self.ignore_file, excludes)?;
                self.tree.hash_dir(path, &rules)?
            }
            ArtifactLocator::LocalImage(image) => self.engine.image_id(image)?,
            ArtifactLocator::RemoteImage {
                image,
                provider,
                credentials,
            } => self
                .registry
                .resolve(image, provider, credentials.as_ref())?,
        };

        info!(target: "attestor", "fingerprint of {}: {}", locator, fingerprint);
        Ok(fingerprint)
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(&AttestorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactType;
    use crate::digest::sha256_bytes;

    #[test]
    fn file_locator_hashes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("FILE.tgz");
        std::fs::write(&path, b"known bytes").unwrap();

        let fp = Fingerprinter::default()
            .fingerprint(&ArtifactLocator::File(path))
            .unwrap();
        assert_eq!(fp, sha256_bytes(b"known bytes"));
    }

    #[test]
    fn directory_locator_honors_ignore_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.py"), b"print('hi')").unwrap();
        std::fs::write(dir.path().join(".attestor_ignore"), b"*.pyc\n").unwrap();

        let fingerprinter = Fingerprinter::default();
        let locator = ArtifactLocator::Directory {
            path: dir.path().to_path_buf(),
            excludes: Vec::new(),
        };
        let before = fingerprinter.fingerprint(&locator).unwrap();

        std::fs::write(dir.path().join("app.pyc"), b"\x00bytecode").unwrap();
        assert_eq!(before, fingerprinter.fingerprint(&locator).unwrap());

        std::fs::write(dir.path().join("app.py"), b"print('bye')").unwrap();
        assert_ne!(before, fingerprinter.fingerprint(&locator).unwrap());
    }

    #[test]
    fn invalid_request_fails_before_io() {
        let request = FingerprintRequest {
            artifact_type: Some(ArtifactType::File),
            name: "/nonexistent/attestor/artifact.tgz".to_string(),
            registry_username: Some("bot".to_string()),
            ..Default::default()
        };
        let err = Fingerprinter::default().resolve(&request).expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn supplied_sha256_is_returned_without_computation() {
        let request = FingerprintRequest {
            artifact_type: Some(ArtifactType::File),
            name: "/nonexistent/attestor/artifact.tgz".to_string(),
            sha256: Some("0".repeat(64)),
            ..Default::default()
        };
        let fp = Fingerprinter::default().resolve(&request).unwrap();
        assert_eq!(fp.as_str(), "0".repeat(64));
    }
}
