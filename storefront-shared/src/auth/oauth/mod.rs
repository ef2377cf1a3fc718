/// OAuth2 identity provider port
///
/// The auth service talks to the identity provider only through
/// [`OAuthProvider`]: build the consent URL, exchange the callback code,
/// read the user's profile, trade a stored refresh token for a new access
/// token, and build the revoke URL used on sign-out.
///
/// # Implementations
///
/// - [`google::GoogleOAuth`]: Google OAuth2 over `reqwest`
/// - [`mock::MockOAuthProvider`]: scripted provider for tests and local runs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub mod google;
pub mod mock;

pub use google::GoogleOAuth;
pub use mock::MockOAuthProvider;

/// Error type for identity provider calls
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Transport or decoding failure
    #[error("OAuth request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("OAuth provider returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Profile came back without an email address
    #[error("OAuth profile has no email address")]
    MissingEmail,

    /// Endpoint configuration is unusable
    #[error("Invalid OAuth configuration: {0}")]
    Config(String),
}

/// Tokens returned by the provider's token endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,

    /// Only present on the first consent, or when consent is forced
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Identity read from the provider's userinfo endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthProfile {
    /// Subject identifier at the provider
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Consent page URL carrying `state`
    ///
    /// With `force_consent` the provider re-asks for consent, which makes it
    /// hand out a fresh refresh token.
    fn authorize_url(&self, state: &str, force_consent: bool) -> String;

    async fn exchange_code(&self, code: &str) -> Result<OAuthTokens, OAuthError>;

    async fn fetch_profile(&self, access_token: &str) -> Result<OAuthProfile, OAuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, OAuthError>;

    /// URL the browser is sent to on sign-out to revoke `token`
    fn revoke_url(&self, token: &str) -> String;
}

/// Appends the standard authorization-code parameters to `base`
pub(crate) fn build_authorize_url(
    base: &Url,
    client_id: &str,
    redirect_url: &str,
    scopes: &str,
    state: &str,
    force_consent: bool,
) -> String {
    let mut url = base.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", scopes)
            .append_pair("state", state)
            .append_pair("access_type", "offline");
        if force_consent {
            query.append_pair("prompt", "consent");
        }
    }
    url.to_string()
}

/// `base?token=<token>` with the token query-encoded
pub(crate) fn build_revoke_url(base: &Url, token: &str) -> String {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("token", token);
    url.to_string()
}
