//! Access tokens and the in-memory token cache
//!
//! The cache holds at most one token. Its expiry is computed once, at write
//! time, as `now + expires_in - EXPIRY_MARGIN_SECS` on the local clock. The
//! server's `created_at` is kept as data only.
//! A token with `expires_in == 0` is never served from the cache.

use serde::{Deserialize, Serialize};

use crate::constants::EXPIRY_MARGIN_SECS;

/// Token endpoint response for the password, code and refresh grants.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Lifetime in seconds (delta, not absolute)
    #[serde(default)]
    pub expires_in: i64,
    /// Creation time as unix seconds, as reported by the server
    #[serde(default)]
    pub created_at: i64,
}

/// Options for an explicit token request.
///
/// The default request asks for whatever token is current: it is served from
/// the cache when possible. A code, a refresh token or `force_refresh`
/// forces a live exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRequest {
    /// Authorization code returned to the redirect URI
    pub code: Option<String>,
    /// Refresh token from a previous exchange
    pub refresh_token: Option<String>,
    /// PKCE verifier matching the challenge sent to the authorize page
    pub code_verifier: Option<String>,
    /// Exchange even if the cached token is still fresh
    pub force_refresh: bool,
}

impl TokenRequest {
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn refresh(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: Some(refresh_token.into()),
            ..Self::default()
        }
    }

    /// Re-run the credential's own grant, ignoring the cache.
    pub fn force() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }

    pub fn with_code_verifier(mut self, verifier: impl Into<String>) -> Self {
        self.code_verifier = Some(verifier.into());
        self
    }

    /// Whether this request must bypass the cache.
    pub fn is_forced(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        self.force_refresh || present(&self.code) || present(&self.refresh_token)
    }
}

/// Most recently exchanged token and its computed expiry.
#[derive(Debug, Default)]
pub struct TokenCache {
    token: Option<AccessToken>,
    expires_at: Option<i64>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached token, regardless of expiry.
    pub fn get(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Expiry instant in unix seconds, if the cached token can expire at all.
    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    /// Replace the cached token wholesale and recompute its expiry.
    pub fn store(&mut self, token: AccessToken, now: i64) {
        self.expires_at = (token.expires_in > 0).then(|| {
            now.saturating_add(token.expires_in)
                .saturating_sub(EXPIRY_MARGIN_SECS)
        });
        self.token = Some(token);
    }

    /// Whether the cache cannot serve a token at `now` (unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        match (&self.token, self.expires_at) {
            (Some(token), Some(expires_at)) => token.access_token.is_empty() || now >= expires_at,
            _ => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_secs())
    }

    /// Cached token if it is still usable at `now`.
    pub fn fresh_at(&self, now: i64) -> Option<&AccessToken> {
        if self.is_expired_at(now) {
            None
        } else {
            self.token.as_ref()
        }
    }
}

/// Current unix time in seconds.
pub fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
