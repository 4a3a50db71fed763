//! Registry Digest Resolver.
//!
//! Resolves the manifest digest of an image held in a remote container
//! registry without pulling its layers: derive the registry endpoints,
//! normalize the image name, exchange credentials for a pull token, then read
//! the digest the registry reports for the manifest (or manifest list).

pub mod auth;
pub mod client;
pub mod endpoint;
pub mod reference;

pub use auth::PullToken;
pub use client::RegistryResolver;
pub use endpoint::{RegistryEndpoint, TokenExchange};
pub use reference::{provider_for_image, ImageName};
