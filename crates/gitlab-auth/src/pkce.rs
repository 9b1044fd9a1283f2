//! PKCE (Proof Key for Code Exchange) per RFC 7636
//!
//! GitLab accepts PKCE on the authorization-code flow. The verifier stays with
//! the caller and is sent with the code exchange; the S256 challenge goes into
//! the authorization URL.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Generate a random code verifier.
///
/// 32 random bytes encoded as URL-safe base64 without padding, i.e. 43
/// characters, the minimum length RFC 7636 allows.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// `BASE64URL(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
