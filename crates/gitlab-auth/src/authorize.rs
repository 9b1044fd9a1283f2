//! Authorization URL construction for the authorization-code flow
//!
//! No network call is made here: the caller sends the user to the returned
//! URL and later exchanges the code GitLab hands to the redirect URI.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::constants::AUTHORIZE_PATH;

/// Everything except RFC 3986 unreserved characters.
pub const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// `{endpoint}/oauth/authorize?response_type=code&client_id=..&redirect_uri=..&scope=..`
pub fn authorize_url(endpoint: &str, client_id: &str, redirect_uri: &str, scope: &str) -> String {
    format!(
        "{}{}?response_type=code&client_id={}&redirect_uri={}&scope={}",
        endpoint.trim_end_matches('/'),
        AUTHORIZE_PATH,
        client_id,
        query_escape(redirect_uri),
        query_escape(scope),
    )
}

/// Authorization URL carrying a CSRF `state` and an S256 PKCE challenge.
pub fn authorize_url_with_pkce(
    endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &str,
    challenge: &str,
) -> String {
    format!(
        "{}&state={}&code_challenge={}&code_challenge_method=S256",
        authorize_url(endpoint, client_id, redirect_uri, scope),
        query_escape(state),
        challenge,
    )
}

/// Escape a query component: unreserved characters pass through, spaces
/// become `+`, everything else is percent-encoded.
pub fn query_escape(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT)
        .to_string()
        .replace("%20", "+")
}
