use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while computing or validating a fingerprint.
///
/// Every variant names the artifact, path or URL it concerns so the command
/// layer can tell "this artifact does not exist" apart from "my registry
/// credentials are wrong".
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// A file, directory, image or tag is absent.
    #[error("{artifact} not found: {reason}")]
    NotFound { artifact: String, reason: String },

    /// Permission denied somewhere inside the artifact.
    #[error("access denied to '{}': {source}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The registry rejected the credentials or the provider is unsupported.
    #[error("registry authentication failed for {registry}: {message}")]
    Auth { registry: String, message: String },

    /// Transport failure or transient server error.
    #[error("network error calling {url}: {message}")]
    Network {
        url: String,
        message: String,
        retryable: bool,
    },

    /// The registry answered with something we cannot interpret.
    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// The local container engine could not be reached.
    #[error("container engine '{engine}' is unavailable: {message}")]
    EngineUnavailable { engine: String, message: String },

    /// Malformed digest, conflicting locator fields or invalid flag combinations.
    #[error("{0}")]
    Validation(String),

    /// Any other I/O failure while reading artifact content.
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse failure category, used for display and exit-code decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Access,
    Auth,
    Network,
    EngineUnavailable,
    Validation,
    Io,
    Config,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::Access => "access",
            Self::Auth => "auth",
            Self::Network => "network",
            Self::EngineUnavailable => "engine-unavailable",
            Self::Validation => "validation",
            Self::Io => "io",
            Self::Config => "config",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FingerprintError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Access { .. } => ErrorKind::Access,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Network { .. } | Self::InvalidResponse { .. } => ErrorKind::Network,
            Self::EngineUnavailable { .. } => ErrorKind::EngineUnavailable,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Io { .. } => ErrorKind::Io,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { retryable: true, .. })
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Maps an I/O error on `path` to the matching failure kind.
    pub(crate) fn from_io(path: impl Into<PathBuf>, artifact: &str, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                artifact: artifact.to_string(),
                reason: format!("'{}' does not exist", path.display()),
            },
            io::ErrorKind::PermissionDenied => Self::Access { path, source },
            _ => Self::Io { path, source },
        }
    }
}

pub type Result<T, E = FingerprintError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_kinds() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let err = FingerprintError::from_io("/srv/data", "directory", denied);
        assert_eq!(err.kind(), ErrorKind::Access);

        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = FingerprintError::from_io("/srv/data", "directory", missing);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("/srv/data"));
    }

    #[test]
    fn only_transient_network_errors_retry() {
        let transient = FingerprintError::Network {
            url: "https://ghcr.io/v2".to_string(),
            message: "503".to_string(),
            retryable: true,
        };
        assert!(transient.is_retryable());

        let auth = FingerprintError::Auth {
            registry: "ghcr.io".to_string(),
            message: "bad credentials".to_string(),
        };
        assert!(!auth.is_retryable());
        assert_eq!(auth.kind().as_str(), "auth");
    }
}
