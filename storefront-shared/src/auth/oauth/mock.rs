/// Scripted OAuth provider
///
/// Returns a fixed profile and configurable tokens without any network
/// access. Each call is logged (`"exchange_code"`, `"fetch_profile"`,
/// `"refresh"`) and failures can be switched on per operation.
///
/// # Example
///
/// ```
/// use storefront_shared::auth::oauth::{MockOAuthProvider, OAuthProvider};
///
/// let provider = MockOAuthProvider::new("g-123", "jane@example.com", "Jane");
/// let url = provider.authorize_url("state", true);
/// assert!(url.contains("prompt=consent"));
/// ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use url::Url;

use super::google::{GOOGLE_AUTH_URL, GOOGLE_REVOKE_URL};
use super::{build_authorize_url, build_revoke_url, OAuthError, OAuthProfile, OAuthProvider, OAuthTokens};

/// Refresh token handed out by default on code exchange
pub const MOCK_REFRESH_TOKEN: &str = "mock-google-refresh-token";

#[derive(Debug)]
struct MockState {
    profile: OAuthProfile,
    refresh_token: Option<String>,
    fail_exchange: bool,
    fail_profile: bool,
    fail_refresh: bool,
    calls: Vec<String>,
}

#[derive(Debug)]
pub struct MockOAuthProvider {
    state: Mutex<MockState>,
    auth_url: Url,
    revoke_url: Url,
}

impl MockOAuthProvider {
    pub fn new(id: &str, email: &str, name: &str) -> Self {
        Self {
            state: Mutex::new(MockState {
                profile: OAuthProfile {
                    id: id.to_string(),
                    email: Some(email.to_string()),
                    name: Some(name.to_string()),
                },
                refresh_token: Some(MOCK_REFRESH_TOKEN.to_string()),
                fail_exchange: false,
                fail_profile: false,
                fail_refresh: false,
                calls: Vec::new(),
            }),
            auth_url: Url::parse(GOOGLE_AUTH_URL).expect("constant URL is valid"),
            revoke_url: Url::parse(GOOGLE_REVOKE_URL).expect("constant URL is valid"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refresh token returned by the next code exchange (`None` = omitted)
    pub fn set_refresh_token(&self, token: Option<&str>) {
        self.lock().refresh_token = token.map(str::to_string);
    }

    pub fn set_profile(&self, profile: OAuthProfile) {
        self.lock().profile = profile;
    }

    pub fn fail_exchange(&self) {
        self.lock().fail_exchange = true;
    }

    pub fn fail_profile(&self) {
        self.lock().fail_profile = true;
    }

    pub fn fail_refresh(&self) {
        self.lock().fail_refresh = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn upstream_error() -> OAuthError {
        OAuthError::Upstream {
            status: 400,
            body: "invalid_grant".to_string(),
        }
    }
}

#[async_trait]
impl OAuthProvider for MockOAuthProvider {
    fn authorize_url(&self, state: &str, force_consent: bool) -> String {
        build_authorize_url(
            &self.auth_url,
            "mock-client-id",
            "http://localhost/v1/auth/google/callback",
            "openid email profile",
            state,
            force_consent,
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthTokens, OAuthError> {
        let mut state = self.lock();
        state.calls.push("exchange_code".to_string());
        if state.fail_exchange {
            return Err(Self::upstream_error());
        }
        Ok(OAuthTokens {
            access_token: format!("mock-access-{}", code),
            refresh_token: state.refresh_token.clone(),
            expires_in: Some(3599),
        })
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<OAuthProfile, OAuthError> {
        let mut state = self.lock();
        state.calls.push("fetch_profile".to_string());
        if state.fail_profile {
            return Err(Self::upstream_error());
        }
        match state.profile.email.as_deref() {
            Some(email) if !email.is_empty() => Ok(state.profile.clone()),
            _ => Err(OAuthError::MissingEmail),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, OAuthError> {
        let mut state = self.lock();
        state.calls.push("refresh".to_string());
        if state.fail_refresh || refresh_token.is_empty() {
            return Err(Self::upstream_error());
        }
        Ok(OAuthTokens {
            access_token: "mock-refreshed-access".to_string(),
            refresh_token: None,
            expires_in: Some(3599),
        })
    }

    fn revoke_url(&self, token: &str) -> String {
        build_revoke_url(&self.revoke_url, token)
    }
}
