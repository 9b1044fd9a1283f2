//! GitLab REST client
//!
//! Resource services call `Client::invoke_authenticated`, which resolves a
//! current access token through `OAuthService` (cache hit or exchange), asks
//! the credential for the call's authorization header, and hands the call to
//! the `Dispatcher`. The dispatcher encodes arguments (query string for reads,
//! JSON body otherwise), sends through an injected `Transport`, and decodes
//! either the typed reply or the structured `ApiError`.

pub mod client;
pub mod commits;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod oauth;
pub mod options;
pub mod transport;
pub mod version;

#[cfg(test)]
mod test_support;

pub use client::{Client, ClientOptions};
pub use commits::{Commit, CommitStats, Commits, ListCommitsOptions};
pub use context::Context;
pub use dispatch::Dispatcher;
pub use error::{ApiError, Error, Result};
pub use oauth::OAuthService;
pub use options::{ListOptions, Sort};
pub use transport::{ReqwestTransport, Request, Response, Transport};
pub use version::{Version, VersionService};

pub use gitlab_auth::{AccessToken, Credential, TokenKind, TokenRequest, now_secs};
pub use reqwest::Method;
pub use tokio_util::sync::CancellationToken;
