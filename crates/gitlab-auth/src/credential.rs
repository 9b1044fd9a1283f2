//! Credential variants and per-call authorization
//!
//! A `Credential` is the immutable description of how a client authenticates.
//! Each variant knows three things: which endpoint it talks to, what (if
//! anything) it sends to the token endpoint, and how to turn the current
//! access token into the authorization header of an outgoing request.
//!
//! - `Token`: a pre-issued token, never exchanged. Sent as `Bearer`, or in the
//!   `JOB-TOKEN` / `PRIVATE-TOKEN` header depending on its kind.
//! - `Password`: resource owner password grant. Note that GitLab disables this
//!   flow for users with two-factor authentication turned on.
//! - `OAuth`: authorization-code flow with refresh tokens.

use std::collections::BTreeMap;
use std::str::FromStr;

use common::Secret;
use serde::Deserialize;

use crate::constants::{
    AUTHORIZATION_HEADER, DEFAULT_ENDPOINT, JOB_TOKEN_HEADER, PRIVATE_TOKEN_HEADER,
};
use crate::error::{Error, Result};
use crate::token::{AccessToken, TokenRequest};

/// Form posted to the token endpoint. Keys are the OAuth parameter names.
pub type ExchangeBody = BTreeMap<&'static str, String>;

/// How a static token is presented to the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// `Authorization: Bearer <token>` (OAuth or personal access tokens)
    #[default]
    Bearer,
    /// `JOB-TOKEN: <token>` (CI_JOB_TOKEN)
    Job,
    /// `PRIVATE-TOKEN: <token>` (personal/project/group access tokens)
    Private,
}

impl FromStr for TokenKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "bearer" => Ok(TokenKind::Bearer),
            "job" => Ok(TokenKind::Job),
            "private" => Ok(TokenKind::Private),
            other => Err(Error::InvalidCredentials(format!(
                "unknown token kind {other:?}, expected bearer, job or private"
            ))),
        }
    }
}

/// Authorization applied to exactly one outgoing request.
#[derive(Debug, Clone)]
pub enum CallDirective {
    /// Sent as `Authorization: Bearer <token>`
    Bearer(Secret<String>),
    /// Sent verbatim in the named header
    Header {
        name: &'static str,
        value: Secret<String>,
    },
}

impl CallDirective {
    /// Header name and value to set on the request.
    ///
    /// Returns `None` when there is nothing to send (for instance a password
    /// credential before its first exchange).
    pub fn header(&self) -> Option<(&'static str, String)> {
        match self {
            CallDirective::Bearer(token) if token.is_empty() => None,
            CallDirective::Bearer(token) => {
                Some((AUTHORIZATION_HEADER, format!("Bearer {}", token.expose())))
            }
            CallDirective::Header { value, .. } if value.is_empty() => None,
            CallDirective::Header { name, value } => Some((*name, value.expose().clone())),
        }
    }
}

/// Client credentials, fixed for the lifetime of a client.
#[derive(Debug, Clone)]
pub enum Credential {
    Token {
        endpoint: Option<String>,
        kind: TokenKind,
        token: Secret<String>,
    },
    Password {
        endpoint: Option<String>,
        username: String,
        password: Secret<String>,
    },
    OAuth {
        endpoint: Option<String>,
        client_id: String,
        client_secret: Secret<String>,
        redirect_uri: String,
    },
}

impl Credential {
    /// Static bearer token against the default endpoint.
    pub fn token(token: impl Into<Secret<String>>) -> Self {
        Credential::Token {
            endpoint: None,
            kind: TokenKind::Bearer,
            token: token.into(),
        }
    }

    pub fn password(username: impl Into<String>, password: impl Into<Secret<String>>) -> Self {
        Credential::Password {
            endpoint: None,
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn oauth(
        client_id: impl Into<String>,
        client_secret: impl Into<Secret<String>>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Credential::OAuth {
            endpoint: None,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Point the credential at a self-managed instance.
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_owned();
        let url = (!url.is_empty()).then_some(url);
        match &mut self {
            Credential::Token { endpoint, .. }
            | Credential::Password { endpoint, .. }
            | Credential::OAuth { endpoint, .. } => *endpoint = url,
        }
        self
    }

    /// Change how a static token is presented. No effect on other variants.
    pub fn with_kind(mut self, new_kind: TokenKind) -> Self {
        if let Credential::Token { kind, .. } = &mut self {
            *kind = new_kind;
        }
        self
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Credential::Token { .. } => "token",
            Credential::Password { .. } => "password",
            Credential::OAuth { .. } => "oauth",
        }
    }

    /// Base URL for every call made under this credential.
    pub fn endpoint(&self) -> &str {
        self.configured_endpoint().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Endpoint explicitly set on the credential, if any.
    pub fn configured_endpoint(&self) -> Option<&str> {
        match self {
            Credential::Token { endpoint, .. }
            | Credential::Password { endpoint, .. }
            | Credential::OAuth { endpoint, .. } => endpoint.as_deref(),
        }
    }

    /// Form to post to the token endpoint.
    ///
    /// `None` means this credential never exchanges (static tokens).
    /// For `OAuth`, a refresh token in `request` selects the `refresh_token`
    /// grant; otherwise an authorization code selects `authorization_code`.
    pub fn exchange_body(&self, request: &TokenRequest) -> Option<ExchangeBody> {
        match self {
            Credential::Token { .. } => None,
            Credential::Password {
                username, password, ..
            } => Some(BTreeMap::from([
                ("grant_type", "password".to_owned()),
                ("username", username.clone()),
                ("password", password.expose().clone()),
            ])),
            Credential::OAuth {
                client_id,
                client_secret,
                redirect_uri,
                ..
            } => {
                let mut body = BTreeMap::from([
                    ("client_id", client_id.clone()),
                    ("client_secret", client_secret.expose().clone()),
                    ("redirect_uri", redirect_uri.clone()),
                ]);
                if let Some(refresh) = request.refresh_token.as_deref().filter(|r| !r.is_empty()) {
                    body.insert("grant_type", "refresh_token".to_owned());
                    body.insert("refresh_token", refresh.to_owned());
                } else if let Some(code) = request.code.as_deref().filter(|c| !c.is_empty()) {
                    body.insert("grant_type", "authorization_code".to_owned());
                    body.insert("code", code.to_owned());
                    if let Some(verifier) = &request.code_verifier {
                        body.insert("code_verifier", verifier.clone());
                    }
                }
                Some(body)
            }
        }
    }

    /// Authorization for one call, given the current access token (if any).
    pub fn call_directive(&self, token: Option<&AccessToken>) -> CallDirective {
        match self {
            Credential::Token {
                kind: TokenKind::Job,
                token,
                ..
            } => CallDirective::Header {
                name: JOB_TOKEN_HEADER,
                value: token.clone(),
            },
            Credential::Token {
                kind: TokenKind::Private,
                token,
                ..
            } => CallDirective::Header {
                name: PRIVATE_TOKEN_HEADER,
                value: token.clone(),
            },
            Credential::Token { token, .. } => CallDirective::Bearer(token.clone()),
            Credential::Password { .. } | Credential::OAuth { .. } => CallDirective::Bearer(
                token
                    .map(|t| Secret::new(t.access_token.clone()))
                    .unwrap_or_default(),
            ),
        }
    }

    /// Check that every field the variant needs is present.
    pub fn validate(&self) -> Result<()> {
        match self {
            Credential::Token { token, .. } if token.is_empty() => Err(
                Error::InvalidCredentials("access token must not be empty".into()),
            ),
            Credential::Password {
                username, password, ..
            } if username.is_empty() || password.is_empty() => Err(Error::InvalidCredentials(
                "username and password must not be empty".into(),
            )),
            Credential::OAuth {
                client_id,
                client_secret,
                redirect_uri,
                ..
            } if client_id.is_empty() || client_secret.is_empty() || redirect_uri.is_empty() => {
                Err(Error::InvalidCredentials(
                    "client_id, client_secret and redirect_uri must not be empty".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}
