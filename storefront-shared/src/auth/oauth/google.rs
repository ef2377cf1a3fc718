/// Google OAuth2 client
///
/// Authorization-code flow with `access_type=offline` so the first consent
/// yields a refresh token. Token calls are form-encoded POSTs; the profile
/// comes from the v2 userinfo endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::{build_authorize_url, build_revoke_url, OAuthError, OAuthProfile, OAuthProvider, OAuthTokens};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
pub const GOOGLE_REVOKE_URL: &str = "https://accounts.google.com/o/oauth2/revoke";

const SCOPES: &str = "openid email profile";

/// Google endpoints; overridable for tests against a local server
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub revoke_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            revoke_url: GOOGLE_REVOKE_URL.to_string(),
        }
    }
}

pub struct GoogleOAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    auth_url: Url,
    token_url: Url,
    userinfo_url: Url,
    revoke_url: Url,
}

impl std::fmt::Debug for GoogleOAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuth")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

impl GoogleOAuth {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Result<Self, OAuthError> {
        Self::with_endpoints(client_id, client_secret, redirect_url, GoogleEndpoints::default())
    }

    pub fn with_endpoints(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
        endpoints: GoogleEndpoints,
    ) -> Result<Self, OAuthError> {
        let parse = |name: &str, raw: &str| {
            Url::parse(raw).map_err(|e| OAuthError::Config(format!("{} '{}': {}", name, raw, e)))
        };

        let redirect_url = redirect_url.into();
        parse("redirect_url", &redirect_url)?;

        Ok(Self {
            client: Client::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url,
            auth_url: parse("auth_url", &endpoints.auth_url)?,
            token_url: parse("token_url", &endpoints.token_url)?,
            userinfo_url: parse("userinfo_url", &endpoints.userinfo_url)?,
            revoke_url: parse("revoke_url", &endpoints.revoke_url)?,
        })
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, OAuthError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OAuthError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuth {
    fn authorize_url(&self, state: &str, force_consent: bool) -> String {
        build_authorize_url(
            &self.auth_url,
            &self.client_id,
            &self.redirect_url,
            SCOPES,
            state,
            force_consent,
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthTokens, OAuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let resp = self
            .client
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let tokens: OAuthTokens = Self::read_json(resp).await?;
        debug!(
            has_refresh_token = tokens.refresh_token.is_some(),
            "Exchanged Google authorization code"
        );
        Ok(tokens)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<OAuthProfile, OAuthError> {
        let resp = self
            .client
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let profile: OAuthProfile = Self::read_json(resp).await?;
        match profile.email.as_deref() {
            Some(email) if !email.is_empty() => Ok(profile),
            _ => Err(OAuthError::MissingEmail),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, OAuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let resp = self
            .client
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await?;

        Self::read_json(resp).await
    }

    fn revoke_url(&self, token: &str) -> String {
        build_revoke_url(&self.revoke_url, token)
    }
}
