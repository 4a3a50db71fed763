use std::fmt::{Debug, Formatter};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;

use crate::artifact::Credentials;

use super::endpoint::{RegistryEndpoint, TokenExchange};

/// Scope requested from membership-token services.
const MEMBERSHIP_SCOPE: &str = "member-of-groups:readers";

/// Response fields that may carry the token, in lookup order.
const TOKEN_FIELDS: &[&str] = &["token", "access_token"];

/// Short-lived bearer token for pulling one repository. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct PullToken(String);

impl PullToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl Debug for PullToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("PullToken(<redacted>)")
    }
}

/// A prepared token request: URL plus how to send it.
#[derive(Debug)]
pub(crate) struct TokenRequest<'a> {
    pub url: String,
    exchange: TokenExchange,
    repository: &'a str,
    service: &'a str,
    credentials: Option<&'a Credentials>,
}

impl<'a> TokenRequest<'a> {
    pub fn new(
        endpoint: &'a RegistryEndpoint,
        repository: &'a str,
        credentials: Option<&'a Credentials>,
    ) -> Self {
        let url = match endpoint.token_exchange {
            TokenExchange::RegistryToken => format!("{}/token", endpoint.auth_api),
            TokenExchange::MembershipToken => format!("{}/api/security/token", endpoint.auth_api),
        };
        Self {
            url,
            exchange: endpoint.token_exchange,
            repository,
            service: &endpoint.service,
            credentials,
        }
    }

    pub fn requires_credentials(&self) -> bool {
        self.exchange == TokenExchange::MembershipToken
    }

    pub fn send(&self, agent: &ureq::Agent) -> Result<ureq::Response, ureq::Error> {
        match self.exchange {
            TokenExchange::RegistryToken => {
                let scope = format!("repository:{}:pull", self.repository);
                let mut request = agent
                    .get(&self.url)
                    .query("scope", &scope)
                    .query("service", self.service);
                if let Some(creds) = self.credentials {
                    request = request.set("Authorization", &basic_auth(creds));
                }
                request.call()
            }
            TokenExchange::MembershipToken => {
                let mut request = agent.post(&self.url);
                let username = self.credentials.map(|c| c.username.as_str()).unwrap_or("");
                if let Some(creds) = self.credentials {
                    request = request.set("Authorization", &basic_auth(creds));
                }
                request.send_form(&[("username", username), ("scope", MEMBERSHIP_SCOPE)])
            }
        }
    }
}

pub(crate) fn basic_auth(creds: &Credentials) -> String {
    let raw = format!("{}:{}", creds.username, creds.password);
    format!("Basic {}", STANDARD.encode(raw))
}

/// Pulls the token out of a token-service response body.
pub(crate) fn extract_token(body: &Value) -> Option<PullToken> {
    TOKEN_FIELDS
        .iter()
        .filter_map(|field| body.get(field).and_then(Value::as_str))
        .find(|token| !token.is_empty())
        .map(PullToken::new)
}
