//! Artifact fingerprinting engine for the Attestor workspace.
//!
//! Computes a content-derived SHA-256 identity for a file, a directory tree,
//! a locally built container image or an image held in a remote registry.
//! The same artifact always yields the same fingerprint, wherever it is
//! computed.

pub mod artifact;
pub mod config;
pub mod constants;
pub mod digest;
pub mod error;
pub mod fingerprint;
pub mod ignore;
pub mod local;
pub mod registry;
pub mod tree;

pub use artifact::{ArtifactLocator, ArtifactType, Credentials, FingerprintRequest, Resolution};
pub use config::AttestorConfig;
pub use digest::{validate_fingerprint, Fingerprint};
pub use error::{ErrorKind, FingerprintError, Result};
pub use fingerprint::Fingerprinter;
pub use ignore::{IgnoreRuleSet, TreeEntry};
pub use tree::TreeHasher;
