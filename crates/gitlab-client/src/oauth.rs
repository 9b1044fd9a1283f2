//! Token acquisition with caching and single-flight exchange
//!
//! `OAuthService::access_token` is called before every authenticated request:
//!
//! 1. Without a code or refresh token, a cached token that is not within five
//!    minutes of expiry is returned immediately (no network call).
//! 2. Otherwise the credential is validated; static tokens stop here and
//!    return `None` (they authorize calls with their configured value).
//! 3. The exchange form is POSTed to `/oauth/token` and the reply replaces
//!    the cached token. On failure the cache is left as it was.
//!
//! Exchanges are serialized behind an async mutex. Callers that found the
//! cache cold and then waited on somebody else's exchange receive that
//! exchange's outcome, token or error, instead of firing their own request.
//! A code or refresh token always triggers a live exchange.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use gitlab_auth::{
    AccessToken, Credential, ExchangeBody, TOKEN_PATH, TokenCache, TokenRequest,
    authorize_url, authorize_url_with_pkce, now_secs,
};
use reqwest::Method;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};

pub struct OAuthService {
    credential: Option<Credential>,
    dispatcher: Arc<Dispatcher>,
    cache: RwLock<TokenCache>,
    /// Held for the duration of an exchange; holds the outcome of the most
    /// recently completed exchange.
    flight: Mutex<Option<Result<AccessToken>>>,
    /// Bumped every time an exchange completes.
    generation: AtomicU64,
}

impl OAuthService {
    pub fn new(credential: Option<Credential>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            credential,
            dispatcher,
            cache: RwLock::new(TokenCache::new()),
            flight: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// URL to send the user to for the authorization-code flow.
    pub fn authorize_url(&self, client_id: &str, redirect_uri: &str, scope: &str) -> String {
        authorize_url(self.dispatcher.endpoint(), client_id, redirect_uri, scope)
    }

    /// Authorization URL with CSRF state and PKCE challenge. Pass the matching
    /// verifier in `TokenRequest::with_code_verifier` when exchanging the code.
    pub fn authorize_url_with_pkce(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
        state: &str,
        challenge: &str,
    ) -> String {
        authorize_url_with_pkce(
            self.dispatcher.endpoint(),
            client_id,
            redirect_uri,
            scope,
            state,
            challenge,
        )
    }

    /// Cached token, if it is still usable.
    pub async fn cached(&self) -> Option<AccessToken> {
        self.cache.read().await.fresh_at(now_secs()).cloned()
    }

    /// Current access token, exchanging credentials if needed.
    ///
    /// Returns `Ok(None)` for static-token credentials, which never exchange.
    pub async fn access_token(
        &self,
        ctx: &Context,
        request: &TokenRequest,
    ) -> Result<Option<AccessToken>> {
        let forced = request.is_forced();
        if !forced {
            if let Some(token) = self.cached().await {
                debug!("serving cached access token");
                return Ok(Some(token));
            }
        }

        let credential = self.credential.as_ref().ok_or(Error::CredentialMissing)?;
        credential.validate()?;
        let Some(body) = credential.exchange_body(request) else {
            return Ok(None);
        };

        let seen = self.generation.load(Ordering::Acquire);
        let mut last_outcome = self.flight.lock().await;
        if !forced {
            if self.generation.load(Ordering::Acquire) != seen {
                match last_outcome.clone() {
                    Some(Ok(token)) => {
                        debug!("access token exchanged by concurrent caller");
                        return Ok(Some(token));
                    }
                    Some(Err(err)) => {
                        debug!(error = %err, "concurrent token exchange failed");
                        return Err(err);
                    }
                    None => {}
                }
            }
            if let Some(token) = self.cached().await {
                debug!("access token refreshed by concurrent caller");
                return Ok(Some(token));
            }
        }

        let result = self.exchange(ctx, credential, &body).await;
        match &result {
            Ok(token) => {
                self.cache.write().await.store(token.clone(), now_secs());
                *last_outcome = Some(Ok(token.clone()));
                self.generation.fetch_add(1, Ordering::Release);
                metrics::counter!("gitlab_token_exchanges_total", "outcome" => "success")
                    .increment(1);
                info!(
                    credential = credential.label(),
                    expires_in = token.expires_in,
                    "access token exchanged"
                );
            }
            // The caller's own cancel or deadline says nothing about the
            // exchange itself; waiters get to try theirs.
            Err(err) if err.is_interrupted() => {}
            Err(err) => {
                *last_outcome = Some(Err(err.clone()));
                self.generation.fetch_add(1, Ordering::Release);
                metrics::counter!("gitlab_token_exchanges_total", "outcome" => "failure")
                    .increment(1);
                warn!(credential = credential.label(), error = %err, "token exchange failed");
            }
        }
        result.map(Some)
    }

    async fn exchange(
        &self,
        ctx: &Context,
        credential: &Credential,
        body: &ExchangeBody,
    ) -> Result<AccessToken> {
        debug!(credential = credential.label(), "exchanging credentials for access token");
        let token: AccessToken = self
            .dispatcher
            .invoke(ctx, Method::POST, TOKEN_PATH, Some(body), None)
            .await
            .map_err(|e| match e {
                Error::Transport(msg) => Error::TokenExchange(msg),
                Error::Decode(msg) => {
                    Error::TokenExchange(format!("invalid token response: {msg}"))
                }
                other => other,
            })?;

        if token.access_token.is_empty() {
            return Err(Error::TokenExchange(
                "token response carried no access_token".into(),
            ));
        }
        Ok(token)
    }
}
