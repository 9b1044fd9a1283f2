//! Client facade
//!
//! Owns the dispatcher and the OAuth service and exposes the authenticated
//! call path every resource service goes through: current token, then
//! the credential's call directive, then dispatch.

use std::sync::Arc;
use std::time::Duration;

use gitlab_auth::{Credential, DEFAULT_ENDPOINT, TokenRequest};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::commits::Commits;
use crate::context::Context;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::oauth::OAuthService;
use crate::transport::{ReqwestTransport, Transport};
use crate::version::VersionService;

/// Client-wide settings. The credential's own endpoint, when set, takes
/// precedence over `endpoint`.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub endpoint: Option<String>,
    /// Upper bound for every call, on top of the caller's context
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: None,
            user_agent: concat!("gitlab-client/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// GitLab API client. Cheap to clone; clones share the token cache.
#[derive(Clone)]
pub struct Client {
    dispatcher: Arc<Dispatcher>,
    oauth: Arc<OAuthService>,
}

impl Client {
    /// Client using a default reqwest transport.
    pub fn new(credential: Option<Credential>, options: ClientOptions) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::try_default()?);
        Self::with_transport(credential, options, transport)
    }

    /// Client using the given transport.
    ///
    /// A supplied credential is validated here, so a misconfigured client
    /// fails before it ever makes a call.
    pub fn with_transport(
        credential: Option<Credential>,
        options: ClientOptions,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        if let Some(credential) = &credential {
            credential.validate()?;
        }
        let endpoint = resolve_endpoint(credential.as_ref(), options.endpoint.as_deref())?;
        info!(
            endpoint = %endpoint,
            credential = credential.as_ref().map(Credential::label).unwrap_or("none"),
            "gitlab client configured"
        );

        let dispatcher = Arc::new(Dispatcher::new(
            transport,
            endpoint,
            &options.user_agent,
            options.timeout,
        )?);
        let oauth = Arc::new(OAuthService::new(credential, dispatcher.clone()));
        Ok(Self { dispatcher, oauth })
    }

    pub fn endpoint(&self) -> &str {
        self.dispatcher.endpoint()
    }

    pub fn oauth(&self) -> &OAuthService {
        &self.oauth
    }

    pub fn commits(&self) -> Commits<'_> {
        Commits::new(self)
    }

    pub fn version(&self) -> VersionService<'_> {
        VersionService::new(self)
    }

    /// Call without any authorization.
    pub async fn invoke<A, R>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        args: Option<&A>,
    ) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.dispatcher.invoke(ctx, method, path, args, None).await
    }

    /// Call authorized by the configured credential.
    pub async fn invoke_authenticated<A, R>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        args: Option<&A>,
    ) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let token = self
            .oauth
            .access_token(ctx, &TokenRequest::default())
            .await?;
        let credential = self.oauth.credential().ok_or(Error::CredentialMissing)?;
        let directive = credential.call_directive(token.as_ref());
        self.dispatcher
            .invoke(ctx, method, path, args, Some(&directive))
            .await
    }
}

fn resolve_endpoint(credential: Option<&Credential>, configured: Option<&str>) -> Result<String> {
    let endpoint = credential
        .and_then(Credential::configured_endpoint)
        .or(configured.filter(|e| !e.is_empty()))
        .unwrap_or(DEFAULT_ENDPOINT)
        .trim_end_matches('/');
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(Error::Config(format!(
            "endpoint must start with http:// or https://, got: {endpoint}"
        )));
    }
    Ok(endpoint.to_owned())
}
