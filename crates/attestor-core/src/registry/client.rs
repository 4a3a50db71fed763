use std::io::Read;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::artifact::Credentials;
use crate::config::RegistryConfig;
use crate::constants::{CONTENT_DIGEST_HEADER, MANIFEST_ACCEPT, USER_AGENT};
use crate::digest::{sha256_bytes, Fingerprint};
use crate::error::{FingerprintError, Result};

use super::auth::{extract_token, PullToken, TokenRequest};
use super::endpoint::RegistryEndpoint;
use super::reference::ImageName;

/// Largest manifest body read when the digest header is missing.
const MAX_MANIFEST_BYTES: u64 = 4 * 1024 * 1024;

/// Longest slice of an error body quoted in messages.
const MAX_ERROR_BODY: usize = 200;

/// Resolves manifest digests of images held in a remote registry.
pub struct RegistryResolver {
    agent: ureq::Agent,
    retries: u32,
    backoff: Duration,
}

impl RegistryResolver {
    pub fn new(config: &RegistryConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            retries: config.retries,
            backoff: config.backoff(),
        }
    }

    /// Returns the manifest digest of `image` in the registry named by `provider`.
    pub fn resolve(
        &self,
        image: &str,
        provider: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Fingerprint> {
        let endpoint = RegistryEndpoint::for_provider(provider)?;
        self.resolve_with_endpoint(&endpoint, image, credentials)
    }

    #[instrument(skip(self, credentials), fields(registry = %endpoint.service))]
    pub fn resolve_with_endpoint(
        &self,
        endpoint: &RegistryEndpoint,
        image: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Fingerprint> {
        let name = ImageName::parse(image, endpoint)?;
        let token = self.pull_token(endpoint, &name, credentials)?;
        let digest = self.manifest_digest(endpoint, &name, &token)?;
        info!(target: "attestor",
            "resolved {}:{} in {} to {}",
            name.repository, name.reference, endpoint.service, digest
        );
        Ok(digest)
    }

    fn pull_token(
        &self,
        endpoint: &RegistryEndpoint,
        name: &ImageName,
        credentials: Option<&Credentials>,
    ) -> Result<PullToken> {
        let request = TokenRequest::new(endpoint, &name.repository, credentials);
        if request.requires_credentials() && credentials.is_none() {
            return Err(FingerprintError::Auth {
                registry: endpoint.service.clone(),
                message: "this registry's token service requires --registry-username and --registry-password"
                    .to_string(),
            });
        }

        debug!("requesting pull token from {}", request.url);
        self.with_retry(|| {
            let response = request
                .send(&self.agent)
                .map_err(|e| token_error(endpoint, &request.url, e))?;
            let body: Value = response.into_json().map_err(|e| FingerprintError::InvalidResponse {
                url: request.url.clone(),
                message: format!("token response is not JSON: {e}"),
            })?;
            extract_token(&body).ok_or_else(|| FingerprintError::Auth {
                registry: endpoint.service.clone(),
                message: "token response carried neither 'token' nor 'access_token'".to_string(),
            })
        })
    }

    fn manifest_digest(
        &self,
        endpoint: &RegistryEndpoint,
        name: &ImageName,
        token: &PullToken,
    ) -> Result<Fingerprint> {
        let url = format!(
            "{}/{}/manifests/{}",
            endpoint.main_api, name.repository, name.reference
        );
        debug!("fetching manifest {}", url);

        self.with_retry(|| {
            let response = self
                .agent
                .get(&url)
                .set("Authorization", &token.bearer())
                .set("Accept", MANIFEST_ACCEPT)
                .call()
                .map_err(|e| manifest_error(endpoint, name, &url, e))?;

            if let Some(header) = response.header(CONTENT_DIGEST_HEADER) {
                return Fingerprint::from_prefixed(header).map_err(|_| {
                    FingerprintError::InvalidResponse {
                        url: url.clone(),
                        message: format!("malformed {CONTENT_DIGEST_HEADER} header '{header}'"),
                    }
                });
            }

            debug!("{} header absent, hashing manifest body", CONTENT_DIGEST_HEADER);
            let mut body = Vec::new();
            response
                .into_reader()
                .take(MAX_MANIFEST_BYTES + 1)
                .read_to_end(&mut body)
                .map_err(|e| FingerprintError::Network {
                    url: url.clone(),
                    message: format!("failed to read manifest body: {e}"),
                    retryable: true,
                })?;
            // A truncated body would hash to a digest the registry never assigned.
            if body.len() as u64 > MAX_MANIFEST_BYTES {
                return Err(FingerprintError::InvalidResponse {
                    url: url.clone(),
                    message: format!(
                        "manifest exceeds {MAX_MANIFEST_BYTES} bytes and carries no {CONTENT_DIGEST_HEADER} header"
                    ),
                });
            }
            Ok(sha256_bytes(&body))
        })
    }

    fn with_retry<T>(&self, mut attempt: impl FnMut() -> Result<T>) -> Result<T> {
        let mut retries = 0;
        loop {
            match attempt() {
                Err(e) if e.is_retryable() && retries < self.retries => {
                    retries += 1;
                    let backoff = self.backoff * retries;
                    warn!(
                        retry = retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying registry request: {e}"
                    );
                    thread::sleep(backoff);
                }
                other => return other,
            }
        }
    }
}

fn token_error(endpoint: &RegistryEndpoint, url: &str, err: ureq::Error) -> FingerprintError {
    match err {
        ureq::Error::Status(code, response) if is_transient(code) => FingerprintError::Network {
            url: url.to_string(),
            message: format!("token service returned {code}: {}", error_body(response)),
            retryable: true,
        },
        ureq::Error::Status(code, response) => FingerprintError::Auth {
            registry: endpoint.service.clone(),
            message: format!("token service returned {code}: {}", error_body(response)),
        },
        ureq::Error::Transport(transport) => transport_error(url, transport),
    }
}

fn manifest_error(
    endpoint: &RegistryEndpoint,
    name: &ImageName,
    url: &str,
    err: ureq::Error,
) -> FingerprintError {
    match err {
        ureq::Error::Status(404, _) => FingerprintError::NotFound {
            artifact: format!("image '{}:{}'", name.repository, name.reference),
            reason: format!("manifest not found in registry '{}'", endpoint.service),
        },
        ureq::Error::Status(code @ (401 | 403), response) => FingerprintError::Auth {
            registry: endpoint.service.clone(),
            message: format!(
                "manifest request for '{}' returned {code}: {}",
                name.repository,
                error_body(response)
            ),
        },
        ureq::Error::Status(code, response) => FingerprintError::Network {
            url: url.to_string(),
            message: format!("manifest request returned {code}: {}", error_body(response)),
            retryable: is_transient(code),
        },
        ureq::Error::Transport(transport) => transport_error(url, transport),
    }
}

fn transport_error(url: &str, transport: ureq::Transport) -> FingerprintError {
    FingerprintError::Network {
        url: url.to_string(),
        message: transport.to_string(),
        retryable: true,
    }
}

fn is_transient(code: u16) -> bool {
    code == 429 || code >= 500
}

fn error_body(response: ureq::Response) -> String {
    let body = response.into_string().unwrap_or_default();
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_codes() {
        assert!(is_transient(429));
        assert!(is_transient(503));
        assert!(!is_transient(404));
        assert!(!is_transient(401));
    }

    #[test]
    fn unreachable_registry_is_network_error() {
        let config = RegistryConfig {
            retries: 0,
            backoff_ms: 0,
            timeout_secs: 2,
        };
        let resolver = RegistryResolver::new(&config);
        // Port 9 (discard) on localhost is closed on test hosts.
        let err = resolver
            .resolve("acme/app:1.0", "http://127.0.0.1:9", None)
            .expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::Network);
    }

    #[test]
    fn membership_exchange_without_credentials_fails_before_io() {
        let resolver = RegistryResolver::new(&RegistryConfig::default());
        let err = resolver
            .resolve("team/app:1.0", "acme.jfrog.io", None)
            .expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::Auth);
    }
}
