use crate::constants::DEFAULT_NAMESPACE;
use crate::error::{FingerprintError, Result};

/// How a registry hands out pull tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenExchange {
    /// `GET {auth}/token?scope=repository:<name>:pull&service=<service>`,
    /// with basic auth when credentials are given.
    RegistryToken,
    /// Form-encoded `POST {auth}/api/security/token` issuing a
    /// membership-scoped token. Requires credentials.
    MembershipToken,
}

/// API hosts of one container registry, derived per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    pub main_api: String,
    pub auth_api: String,
    pub service: String,
    pub token_exchange: TokenExchange,
    /// Namespace prepended to single-segment repository names.
    pub implicit_namespace: Option<&'static str>,
}

pub(crate) struct KnownProvider {
    pub name: &'static str,
    /// Registry hosts that appear in image references for this provider.
    pub hosts: &'static [&'static str],
    main_api: &'static str,
    auth_api: &'static str,
    service: &'static str,
    implicit_namespace: Option<&'static str>,
}

/// Providers whose auth hosts cannot be derived from the registry host.
pub(crate) const KNOWN_PROVIDERS: &[KnownProvider] = &[
    KnownProvider {
        name: "dockerhub",
        hosts: &[
            "docker.io",
            "index.docker.io",
            "registry-1.docker.io",
            "registry.hub.docker.com",
        ],
        main_api: "https://registry-1.docker.io/v2",
        auth_api: "https://auth.docker.io",
        service: "registry.docker.io",
        implicit_namespace: Some(DEFAULT_NAMESPACE),
    },
    KnownProvider {
        name: "github",
        hosts: &["ghcr.io"],
        main_api: "https://ghcr.io/v2",
        auth_api: "https://ghcr.io",
        service: "ghcr.io",
        implicit_namespace: None,
    },
];

/// Hostname fragments selecting a non-standard token exchange, and the path
/// its token service lives under.
const TOKEN_STRATEGIES: &[(&str, TokenExchange, &str)] =
    &[("jfrog", TokenExchange::MembershipToken, "/artifactory")];

impl RegistryEndpoint {
    /// Resolves a provider name (`dockerhub`, `github`) or a registry hostname.
    pub fn for_provider(provider: &str) -> Result<Self> {
        let provider = provider.trim();
        match KNOWN_PROVIDERS.iter().find(|p| p.name == provider) {
            Some(known) => Ok(Self {
                main_api: known.main_api.to_string(),
                auth_api: known.auth_api.to_string(),
                service: known.service.to_string(),
                token_exchange: TokenExchange::RegistryToken,
                implicit_namespace: known.implicit_namespace,
            }),
            None => Self::from_host(provider),
        }
    }

    /// Derives endpoints for a self-hosted registry from its hostname.
    ///
    /// Anything after the first `/` is ignored. An explicit `http://` or
    /// `https://` scheme is kept; bare hosts use `https://`.
    pub fn from_host(value: &str) -> Result<Self> {
        let (scheme, rest) = match value.split_once("://") {
            Some((scheme @ ("http" | "https"), rest)) => (scheme, rest),
            Some((scheme, _)) => {
                return Err(FingerprintError::validation(format!(
                    "unsupported registry scheme '{scheme}' in '{value}'"
                )))
            }
            None => ("https", value),
        };
        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() {
            return Err(FingerprintError::validation(format!(
                "registry provider '{value}' names no host"
            )));
        }

        let base = format!("{scheme}://{host}");
        let (token_exchange, auth_path) = TOKEN_STRATEGIES
            .iter()
            .find(|(fragment, _, _)| host.contains(fragment))
            .map(|(_, exchange, path)| (*exchange, *path))
            .unwrap_or((TokenExchange::RegistryToken, "/oauth2"));

        Ok(Self {
            main_api: format!("{base}/v2"),
            auth_api: format!("{base}{auth_path}"),
            service: host.to_string(),
            token_exchange,
            implicit_namespace: None,
        })
    }
}
