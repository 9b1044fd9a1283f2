//! GitLab credential handling
//!
//! Everything here is pure: credential variants, the token cache, PKCE and
//! authorization-URL helpers. The network side (token exchange, dispatch)
//! lives in `gitlab-client`.
//!
//! Credential flow:
//! 1. Caller builds a `Credential` (static token, password, or OAuth app)
//! 2. `Credential::validate()` checks required fields before any network call
//! 3. `Credential::exchange_body()` yields the token endpoint form, or `None`
//!    for static tokens
//! 4. The exchanged `AccessToken` is kept in a `TokenCache` until it is within
//!    five minutes of expiry
//! 5. `Credential::call_directive()` turns the current token into the header
//!    for each API call

pub mod authorize;
pub mod constants;
pub mod credential;
pub mod error;
pub mod pkce;
pub mod token;

pub use authorize::{COMPONENT, authorize_url, authorize_url_with_pkce};
pub use constants::*;
pub use credential::{CallDirective, Credential, ExchangeBody, TokenKind};
pub use error::{Error, Result};
pub use pkce::{compute_challenge, generate_verifier};
pub use token::{AccessToken, TokenCache, TokenRequest, now_secs};
