//! GitLab OAuth and API constants

/// Endpoint used when a credential does not name one.
pub const DEFAULT_ENDPOINT: &str = "https://gitlab.com";

/// Token endpoint path for password, code and refresh grants
pub const TOKEN_PATH: &str = "/oauth/token";

/// Authorization page path for the authorization-code flow
pub const AUTHORIZE_PATH: &str = "/oauth/authorize";

/// Cached tokens are treated as expired this many seconds before the
/// server-reported lifetime runs out, to absorb network latency.
pub const EXPIRY_MARGIN_SECS: i64 = 5 * 60;

/// Header carrying a CI job token
pub const JOB_TOKEN_HEADER: &str = "JOB-TOKEN";

/// Header carrying a personal/project/group access token
pub const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Header carrying `Bearer` tokens
pub const AUTHORIZATION_HEADER: &str = "Authorization";
