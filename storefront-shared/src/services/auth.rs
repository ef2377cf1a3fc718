/// Authentication flows
///
/// Local sign-up / sign-in, Google OAuth sign-in, token refresh and
/// sign-out. Sessions are JWT pairs; the server-side record of a session is
/// the `refresh_token:{user_id}` cache entry.
///
/// # Google refresh tokens
///
/// Google only returns a refresh token on consent. On callback the cached
/// token for the user wins, then the one just returned; when neither is
/// usable the transaction is rolled back and the user is sent back to the
/// consent page with `prompt=consent`.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

use super::{commit, found, rollback, rollback_on_err};
use crate::auth::jwt::{Claims, IssuedToken, TokenIssuer, TokenPair};
use crate::auth::oauth::google::GOOGLE_REVOKE_URL;
use crate::auth::oauth::{OAuthError, OAuthProfile, OAuthProvider};
use crate::auth::password::{hash_password, validate_password_length, verify_password, PasswordError};
use crate::cache::session::{generate_state, hash_token};
use crate::cache::{KeyValueCache, RefreshTokenEntry, SessionCache};
use crate::error::{AppError, AppResult, Dependency, Entity, Operation};
use crate::models::{NewUser, Provider, Role, User};
use crate::store::{StoreError, UserStore, UserTx};

/// Local sign-up payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 1, max = 100, message = "name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,

    pub password: String,
}

/// Local sign-in payload
#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// A freshly opened session
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub role: Role,
    pub provider: Provider,
    pub tokens: TokenPair,
}

/// Result of a Google callback
#[derive(Debug, Clone)]
pub enum GoogleSignIn {
    SignedIn(AuthSession),

    /// No usable Google refresh token; send the user through consent again
    ConsentRequired { url: String },
}

/// Result of a token refresh
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub user_id: Uuid,
    pub access: IssuedToken,

    /// New refresh token for local sessions; Google sessions keep theirs
    pub refresh: Option<IssuedToken>,
}

/// Result of a sign-out
#[derive(Debug, Clone, PartialEq)]
pub enum SignOutOutcome {
    /// Local session ended
    Local,

    /// Google session ended; the browser should visit `revoke_url`
    Google { revoke_url: String },

    /// No live session matched the presented token
    NoSession,
}

pub struct AuthService {
    store: Option<Arc<dyn UserStore>>,
    cache: Option<Arc<dyn KeyValueCache>>,
    oauth: Option<Arc<dyn OAuthProvider>>,
    tokens: Option<Arc<TokenIssuer>>,
}

impl AuthService {
    pub fn new(
        store: Option<Arc<dyn UserStore>>,
        cache: Option<Arc<dyn KeyValueCache>>,
        oauth: Option<Arc<dyn OAuthProvider>>,
        tokens: Option<Arc<TokenIssuer>>,
    ) -> Self {
        Self {
            store,
            cache,
            oauth,
            tokens,
        }
    }

    fn store(&self) -> AppResult<&dyn UserStore> {
        self.store
            .as_deref()
            .ok_or(AppError::NotConfigured(Dependency::Database))
    }

    fn sessions(&self) -> AppResult<SessionCache> {
        self.cache
            .clone()
            .map(SessionCache::new)
            .ok_or(AppError::NotConfigured(Dependency::Cache))
    }

    fn oauth(&self) -> AppResult<&dyn OAuthProvider> {
        self.oauth
            .as_deref()
            .ok_or(AppError::NotConfigured(Dependency::OAuthProvider))
    }

    fn tokens(&self) -> AppResult<&TokenIssuer> {
        self.tokens
            .as_deref()
            .ok_or(AppError::NotConfigured(Dependency::TokenIssuer))
    }

    /// Validates an access token
    pub fn authenticate(&self, access_token: &str) -> AppResult<Claims> {
        self.tokens()?
            .validate_access(access_token)
            .map_err(|e| AppError::InvalidToken(e.to_string()))
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> AppResult<AuthSession> {
        let store = self.store()?;
        let tokens = self.tokens()?;
        let sessions = self.sessions()?;

        let request = SignUpRequest {
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            password: request.password,
        };
        request.validate()?;
        validate_password_length(&request.password).map_err(AppError::InvalidRequest)?;

        if store
            .user_name_exists(&request.name)
            .await
            .map_err(AppError::Database)?
        {
            return Err(AppError::NameTaken);
        }
        if store
            .user_email_exists(&request.email)
            .await
            .map_err(AppError::Database)?
        {
            return Err(AppError::EmailTaken);
        }

        let password_hash = hash_in_background(request.password).await?;

        let mut tx = store.begin_user().await.map_err(AppError::Transaction)?;
        let new_user = NewUser {
            name: request.name,
            email: request.email,
            password_hash: Some(password_hash),
            provider: Provider::Local,
            provider_id: None,
        };
        let result = tx.insert_user(&new_user).await.map_err(insert_user_error);
        let user = rollback_on_err(tx.as_mut(), result).await?;

        let session = self
            .open_local_session(tx.as_mut(), &sessions, tokens, &user)
            .await?;

        debug!(user_id = %user.id, "Local account created");
        Ok(session)
    }

    pub async fn sign_in(&self, request: SignInRequest) -> AppResult<AuthSession> {
        let store = self.store()?;
        let tokens = self.tokens()?;
        let sessions = self.sessions()?;

        let user = store
            .find_user_by_email(request.email.trim())
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::InvalidCredentials)?;

        // Accounts created through Google have no password
        let hash = user
            .password_hash
            .clone()
            .ok_or(AppError::InvalidCredentials)?;
        if !verify_in_background(request.password, hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let mut tx = store.begin_user().await.map_err(AppError::Transaction)?;
        let result = tx
            .record_sign_in(user.id, Provider::Local, None)
            .await
            .map_err(AppError::operation(Operation::RecordSignIn))
            .and_then(|updated| found(updated, Entity::User));
        rollback_on_err(tx.as_mut(), result).await?;

        let session = self
            .open_local_session(tx.as_mut(), &sessions, tokens, &user)
            .await?;

        debug!(user_id = %user.id, "Local sign-in");
        Ok(session)
    }

    /// Issues the pair, stores the hashed refresh token, commits
    async fn open_local_session(
        &self,
        tx: &mut dyn UserTx,
        sessions: &SessionCache,
        tokens: &TokenIssuer,
        user: &User,
    ) -> AppResult<AuthSession> {
        let result = tokens
            .issue_pair(user.id, user.role, Provider::Local)
            .map_err(AppError::from);
        let pair = rollback_on_err(&mut *tx, result).await?;

        let entry = RefreshTokenEntry {
            provider: Provider::Local,
            token: hash_token(&pair.refresh.token),
            expires_at: pair.refresh.expires_at,
        };
        let result = sessions
            .store_refresh_token(user.id, &entry, cache_ttl(tokens))
            .await
            .map_err(AppError::from);
        rollback_on_err(&mut *tx, result).await?;

        if let Err(err) = commit(&mut *tx).await {
            discard_session(sessions, user.id).await;
            return Err(err);
        }

        Ok(AuthSession {
            user_id: user.id,
            role: user.role,
            provider: Provider::Local,
            tokens: pair,
        })
    }

    /// Stores a fresh OAuth state and returns the consent URL
    pub async fn google_signin_url(&self) -> AppResult<String> {
        let oauth = self.oauth()?;
        let sessions = self.sessions()?;

        let state = generate_state();
        sessions.store_oauth_state(&state).await?;

        Ok(oauth.authorize_url(&state, false))
    }

    pub async fn google_callback(&self, state: &str, code: &str) -> AppResult<GoogleSignIn> {
        let oauth = self.oauth()?;
        let store = self.store()?;
        let tokens = self.tokens()?;
        let sessions = self.sessions()?;

        if !sessions.consume_oauth_state(state).await? {
            return Err(AppError::InvalidOAuthState);
        }
        if code.is_empty() {
            return Err(AppError::InvalidRequest("code is required".to_string()));
        }

        let google_tokens = oauth.exchange_code(code).await?;
        let profile = oauth.fetch_profile(&google_tokens.access_token).await?;
        let email = profile
            .email
            .clone()
            .ok_or(AppError::Provider(OAuthError::MissingEmail))?;

        let existing = store
            .find_user_by_email(&email)
            .await
            .map_err(AppError::Database)?;

        let mut tx = store.begin_user().await.map_err(AppError::Transaction)?;
        let user = match existing {
            Some(user) => user,
            None => {
                let new_user = NewUser {
                    name: display_name(&profile, &email),
                    email: email.clone(),
                    password_hash: None,
                    provider: Provider::Google,
                    provider_id: Some(profile.id.clone()),
                };
                let result = tx.insert_user(&new_user).await.map_err(insert_user_error);
                rollback_on_err(tx.as_mut(), result).await?
            }
        };

        let result = tokens
            .issue_pair(user.id, user.role, Provider::Google)
            .map_err(AppError::from);
        let pair = rollback_on_err(tx.as_mut(), result).await?;

        let result = sessions
            .google_refresh_token(user.id)
            .await
            .map_err(AppError::from);
        let cached = rollback_on_err(tx.as_mut(), result).await?;

        let google_refresh = match cached.or_else(|| {
            google_tokens
                .refresh_token
                .clone()
                .filter(|token| !token.is_empty())
        }) {
            Some(token) => token,
            None => {
                rollback(tx.as_mut()).await;
                let state = generate_state();
                sessions.store_oauth_state(&state).await?;
                debug!(user_id = %user.id, "No Google refresh token, forcing consent");
                return Ok(GoogleSignIn::ConsentRequired {
                    url: oauth.authorize_url(&state, true),
                });
            }
        };

        let result = tx
            .record_sign_in(user.id, Provider::Google, Some(&profile.id))
            .await
            .map_err(AppError::operation(Operation::RecordSignIn))
            .and_then(|updated| found(updated, Entity::User));
        rollback_on_err(tx.as_mut(), result).await?;

        let entry = RefreshTokenEntry {
            provider: Provider::Google,
            token: google_refresh,
            expires_at: pair.refresh.expires_at,
        };
        let result = sessions
            .store_refresh_token(user.id, &entry, cache_ttl(tokens))
            .await
            .map_err(AppError::from);
        rollback_on_err(tx.as_mut(), result).await?;

        commit(tx.as_mut()).await?;

        debug!(user_id = %user.id, "Google sign-in");
        Ok(GoogleSignIn::SignedIn(AuthSession {
            user_id: user.id,
            role: user.role,
            provider: Provider::Google,
            tokens: pair,
        }))
    }

    /// Trades a refresh token for a new access token
    ///
    /// Local sessions rotate the refresh token too. The role is re-read
    /// from the store so promotions take effect on the next refresh.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<RefreshOutcome> {
        let tokens = self.tokens()?;
        let sessions = self.sessions()?;
        let store = self.store()?;

        let claims = tokens
            .validate_refresh(refresh_token)
            .map_err(|e| AppError::InvalidToken(e.to_string()))?;

        let entry = sessions
            .refresh_token(claims.sub)
            .await?
            .ok_or_else(|| AppError::InvalidToken("session not found".to_string()))?;

        let user = store
            .find_user(claims.sub)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::InvalidToken("user no longer exists".to_string()))?;

        match entry.provider {
            Provider::Google => {
                self.oauth()?.refresh(&entry.token).await?;
                let access = tokens.issue_access(user.id, user.role, Provider::Google)?;

                debug!(user_id = %user.id, "Google session refreshed");
                Ok(RefreshOutcome {
                    user_id: user.id,
                    access,
                    refresh: None,
                })
            }
            Provider::Local => {
                if entry.token != hash_token(refresh_token) {
                    return Err(AppError::InvalidToken(
                        "refresh token does not match session".to_string(),
                    ));
                }
                sessions.delete_refresh_token(user.id).await?;

                let pair = tokens.issue_pair(user.id, user.role, Provider::Local)?;
                let entry = RefreshTokenEntry {
                    provider: Provider::Local,
                    token: hash_token(&pair.refresh.token),
                    expires_at: pair.refresh.expires_at,
                };
                sessions
                    .store_refresh_token(user.id, &entry, cache_ttl(tokens))
                    .await?;

                debug!(user_id = %user.id, "Local session refreshed");
                Ok(RefreshOutcome {
                    user_id: user.id,
                    access: pair.access,
                    refresh: Some(pair.refresh),
                })
            }
        }
    }

    /// Ends the session named by the refresh token, if any
    pub async fn sign_out(&self, refresh_token: Option<&str>) -> AppResult<SignOutOutcome> {
        let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) else {
            return Ok(SignOutOutcome::NoSession);
        };
        let tokens = self.tokens()?;
        let sessions = self.sessions()?;

        let claims = match tokens.validate_refresh(refresh_token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "Sign-out with unusable refresh token");
                return Ok(SignOutOutcome::NoSession);
            }
        };

        let entry = sessions.refresh_token(claims.sub).await?;
        sessions.delete_refresh_token(claims.sub).await?;

        let outcome = match entry {
            Some(entry) if entry.provider == Provider::Google => SignOutOutcome::Google {
                revoke_url: match self.oauth.as_deref() {
                    Some(oauth) => oauth.revoke_url(&entry.token),
                    None => format!("{}?token={}", GOOGLE_REVOKE_URL, entry.token),
                },
            },
            Some(_) => SignOutOutcome::Local,
            None => SignOutOutcome::NoSession,
        };

        debug!(user_id = %claims.sub, ?outcome, "Signed out");
        Ok(outcome)
    }
}

fn insert_user_error(err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation { .. } => AppError::EmailTaken,
        other => AppError::Operation {
            op: Operation::CreateUser,
            source: other,
        },
    }
}

/// Google display name, falling back to the email's local part
fn display_name(profile: &OAuthProfile, email: &str) -> String {
    let name = profile
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email));
    name.chars().take(100).collect()
}

fn cache_ttl(tokens: &TokenIssuer) -> std::time::Duration {
    tokens
        .refresh_ttl()
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(1))
}

/// Best effort: the entry is useless once the transaction failed
async fn discard_session(sessions: &SessionCache, user_id: Uuid) {
    if let Err(err) = sessions.delete_refresh_token(user_id).await {
        warn!(user_id = %user_id, error = %err, "Failed to discard session entry");
    }
}

async fn hash_in_background(password: String) -> AppResult<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::HashError(e.to_string()))??;
    Ok(hash)
}

async fn verify_in_background(password: String, hash: String) -> AppResult<bool> {
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::VerifyError(e.to_string()))??;
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS};
    use crate::auth::oauth::mock::MOCK_REFRESH_TOKEN;
    use crate::auth::oauth::MockOAuthProvider;
    use crate::cache::session::{oauth_state_key, refresh_token_key};
    use crate::cache::MemoryCache;
    use crate::store::memory::MemoryStore;
    use chrono::Duration;
    use url::Url;

    struct Harness {
        store: MemoryStore,
        cache: MemoryCache,
        oauth: Arc<MockOAuthProvider>,
        tokens: Arc<TokenIssuer>,
        service: AuthService,
    }

    fn harness() -> Harness {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        let oauth = Arc::new(MockOAuthProvider::new("g-1", "jane@gmail.com", "Jane G"));
        let tokens = Arc::new(TokenIssuer::new(
            "test-secret-key-at-least-32-bytes-long",
            Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
        ));
        let service = AuthService::new(
            Some(Arc::new(store.clone())),
            Some(Arc::new(cache.clone())),
            Some(oauth.clone()),
            Some(tokens.clone()),
        );
        Harness {
            store,
            cache,
            oauth,
            tokens,
            service,
        }
    }

    fn sign_up_request() -> SignUpRequest {
        SignUpRequest {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password: "correct horse battery".to_string(),
        }
    }

    fn state_from(url: &str) -> String {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_creates_user_and_session() {
        let h = harness();
        let session = h.service.sign_up(sign_up_request()).await.unwrap();

        let user = h.store.user(session.user_id).unwrap();
        assert_eq!(user.provider, Provider::Local);
        assert!(user.password_hash.unwrap().starts_with("$argon2id$"));

        let raw = h.cache.peek(&refresh_token_key(session.user_id)).unwrap();
        let entry: RefreshTokenEntry = serde_json::from_str(&raw).unwrap();
        assert_eq!(entry.provider, Provider::Local);
        assert_eq!(entry.token, hash_token(&session.tokens.refresh.token));

        let claims = h.service.authenticate(&session.tokens.access.token).unwrap();
        assert_eq!(claims.sub, session.user_id);
    }

    #[tokio::test]
    async fn test_sign_up_conflicts() {
        let h = harness();
        h.service.sign_up(sign_up_request()).await.unwrap();

        let err = h.service.sign_up(sign_up_request()).await.unwrap_err();
        assert_eq!(err.code(), "name_already_exists");

        let mut request = sign_up_request();
        request.name = "Someone Else".to_string();
        request.email = "JANE@example.com".to_string();
        let err = h.service.sign_up(request).await.unwrap_err();
        assert_eq!(err.code(), "email_already_exists");
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let h = harness();

        let mut request = sign_up_request();
        request.password = "short".to_string();
        assert_eq!(
            h.service.sign_up(request).await.unwrap_err().code(),
            "invalid_request"
        );

        let mut request = sign_up_request();
        request.email = "not-an-email".to_string();
        assert_eq!(
            h.service.sign_up(request).await.unwrap_err().code(),
            "invalid_request"
        );

        assert!(h.store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_commit_failure_discards_session() {
        let h = harness();
        h.store.fail_commit();

        let err = h.service.sign_up(sign_up_request()).await.unwrap_err();
        assert_eq!(err.code(), "commit_error");
        assert_eq!(h.store.call_count("rollback"), 1);
        assert!(h
            .cache
            .calls()
            .iter()
            .any(|c| c.starts_with("del refresh_token:")));
    }

    #[tokio::test]
    async fn test_sign_in() {
        let h = harness();
        let signed_up = h.service.sign_up(sign_up_request()).await.unwrap();

        let session = h
            .service
            .sign_in(SignInRequest {
                email: "jane@example.com".to_string(),
                password: "correct horse battery".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user_id, signed_up.user_id);
        assert!(h.store.user(session.user_id).unwrap().last_sign_in_at.is_some());

        let err = h
            .service
            .sign_in(SignInRequest {
                email: "jane@example.com".to_string(),
                password: "wrong password".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_credentials");

        let err = h
            .service
            .sign_in(SignInRequest {
                email: "nobody@example.com".to_string(),
                password: "whatever123".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_credentials");
    }

    #[tokio::test]
    async fn test_missing_store_is_transaction_error() {
        let service = AuthService::new(None, None, None, None);
        let err = service.sign_up(sign_up_request()).await.unwrap_err();
        assert_eq!(err.code(), "transaction_error");
    }

    #[tokio::test]
    async fn test_google_flow_creates_user() {
        let h = harness();
        let url = h.service.google_signin_url().await.unwrap();
        assert!(url.contains("access_type=offline"));
        let state = state_from(&url);
        assert_eq!(h.cache.peek(&oauth_state_key(&state)).as_deref(), Some("valid"));

        let outcome = h.service.google_callback(&state, "code-1").await.unwrap();
        let session = match outcome {
            GoogleSignIn::SignedIn(session) => session,
            other => panic!("expected sign-in, got {:?}", other),
        };

        let user = h.store.user(session.user_id).unwrap();
        assert_eq!(user.provider, Provider::Google);
        assert_eq!(user.provider_id.as_deref(), Some("g-1"));
        assert!(user.password_hash.is_none());

        let raw = h.cache.peek(&refresh_token_key(user.id)).unwrap();
        let entry: RefreshTokenEntry = serde_json::from_str(&raw).unwrap();
        assert_eq!(entry.token, MOCK_REFRESH_TOKEN);

        // State was shortened to one minute
        let ttl = h.cache.ttl(&oauth_state_key(&state)).unwrap();
        assert!(ttl <= std::time::Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_google_callback_rejects_unknown_state() {
        let h = harness();
        let err = h.service.google_callback("forged", "code").await.unwrap_err();
        assert_eq!(err.code(), "invalid_oauth_state");
        assert!(h.oauth.calls().is_empty());
    }

    #[tokio::test]
    async fn test_google_callback_without_refresh_token_forces_consent() {
        let h = harness();
        h.oauth.set_refresh_token(None);
        let state = state_from(&h.service.google_signin_url().await.unwrap());

        let outcome = h.service.google_callback(&state, "code").await.unwrap();
        match outcome {
            GoogleSignIn::ConsentRequired { url } => {
                assert!(url.contains("prompt=consent"));
                let new_state = state_from(&url);
                assert!(h.cache.peek(&oauth_state_key(&new_state)).is_some());
            }
            other => panic!("expected consent redirect, got {:?}", other),
        }

        assert_eq!(h.store.call_count("rollback"), 1);
        assert_eq!(h.store.call_count("commit"), 0);
        assert!(h.store.find_user_by_email("jane@gmail.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_google_callback_prefers_cached_refresh_token() {
        let h = harness();
        let state = state_from(&h.service.google_signin_url().await.unwrap());
        let first = match h.service.google_callback(&state, "code").await.unwrap() {
            GoogleSignIn::SignedIn(session) => session,
            other => panic!("unexpected {:?}", other),
        };

        // Second login: Google omits the refresh token, the cached one is reused
        h.oauth.set_refresh_token(None);
        let state = state_from(&h.service.google_signin_url().await.unwrap());
        let second = match h.service.google_callback(&state, "code").await.unwrap() {
            GoogleSignIn::SignedIn(session) => session,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(first.user_id, second.user_id);

        let raw = h.cache.peek(&refresh_token_key(second.user_id)).unwrap();
        assert!(raw.contains(MOCK_REFRESH_TOKEN));
    }

    #[tokio::test]
    async fn test_google_sign_in_after_local_sign_up_stores_google_token() {
        let h = harness();
        let mut request = sign_up_request();
        request.email = "jane@gmail.com".to_string();
        let local = h.service.sign_up(request).await.unwrap();

        let state = state_from(&h.service.google_signin_url().await.unwrap());
        let google = match h.service.google_callback(&state, "code").await.unwrap() {
            GoogleSignIn::SignedIn(session) => session,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(google.user_id, local.user_id);

        let raw = h.cache.peek(&refresh_token_key(google.user_id)).unwrap();
        let entry: RefreshTokenEntry = serde_json::from_str(&raw).unwrap();
        assert_eq!(entry.provider, Provider::Google);
        assert_eq!(entry.token, MOCK_REFRESH_TOKEN);

        let outcome = h
            .service
            .sign_out(Some(&google.tokens.refresh.token))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SignOutOutcome::Google {
                revoke_url: format!(
                    "https://accounts.google.com/o/oauth2/revoke?token={}",
                    MOCK_REFRESH_TOKEN
                )
            }
        );
    }

    #[tokio::test]
    async fn test_local_refresh_rotates_tokens() {
        let h = harness();
        let session = h.service.sign_up(sign_up_request()).await.unwrap();

        let outcome = h
            .service
            .refresh(&session.tokens.refresh.token)
            .await
            .unwrap();
        let new_refresh = outcome.refresh.unwrap();
        assert_ne!(new_refresh.token, session.tokens.refresh.token);

        // The old refresh token no longer matches the session
        let err = h
            .service
            .refresh(&session.tokens.refresh.token)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_token");

        assert!(h.service.refresh(&new_refresh.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_role() {
        let h = harness();
        let session = h.service.sign_up(sign_up_request()).await.unwrap();

        let mut user = h.store.user(session.user_id).unwrap();
        user.role = Role::Admin;
        h.store.seed_user(user);

        let outcome = h
            .service
            .refresh(&session.tokens.refresh.token)
            .await
            .unwrap();
        let claims = h.tokens.validate_access(&outcome.access.token).unwrap();
        assert_eq!(claims.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token_and_missing_session() {
        let h = harness();
        let session = h.service.sign_up(sign_up_request()).await.unwrap();

        let err = h
            .service
            .refresh(&session.tokens.access.token)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_token");

        h.service
            .sign_out(Some(&session.tokens.refresh.token))
            .await
            .unwrap();
        let err = h
            .service
            .refresh(&session.tokens.refresh.token)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_token");
    }

    #[tokio::test]
    async fn test_google_refresh_goes_through_provider() {
        let h = harness();
        let state = state_from(&h.service.google_signin_url().await.unwrap());
        let session = match h.service.google_callback(&state, "code").await.unwrap() {
            GoogleSignIn::SignedIn(session) => session,
            other => panic!("unexpected {:?}", other),
        };

        let outcome = h
            .service
            .refresh(&session.tokens.refresh.token)
            .await
            .unwrap();
        assert!(outcome.refresh.is_none());
        assert!(h.oauth.calls().contains(&"refresh".to_string()));

        h.oauth.fail_refresh();
        let err = h
            .service
            .refresh(&session.tokens.refresh.token)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "oauth_provider_error");
    }

    #[tokio::test]
    async fn test_google_sign_out_returns_revoke_url() {
        let h = harness();
        let state = state_from(&h.service.google_signin_url().await.unwrap());
        let session = match h.service.google_callback(&state, "code").await.unwrap() {
            GoogleSignIn::SignedIn(session) => session,
            other => panic!("unexpected {:?}", other),
        };

        let outcome = h
            .service
            .sign_out(Some(&session.tokens.refresh.token))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SignOutOutcome::Google {
                revoke_url: format!(
                    "https://accounts.google.com/o/oauth2/revoke?token={}",
                    MOCK_REFRESH_TOKEN
                )
            }
        );
        assert!(h.cache.peek(&refresh_token_key(session.user_id)).is_none());
    }

    #[tokio::test]
    async fn test_sign_out_local_and_without_session() {
        let h = harness();
        let session = h.service.sign_up(sign_up_request()).await.unwrap();

        assert_eq!(
            h.service
                .sign_out(Some(&session.tokens.refresh.token))
                .await
                .unwrap(),
            SignOutOutcome::Local
        );
        assert_eq!(h.service.sign_out(None).await.unwrap(), SignOutOutcome::NoSession);
        assert_eq!(
            h.service.sign_out(Some("garbage")).await.unwrap(),
            SignOutOutcome::NoSession
        );
    }

    #[test]
    fn test_display_name() {
        let profile = OAuthProfile {
            id: "1".to_string(),
            email: Some("sam@example.com".to_string()),
            name: Some("  ".to_string()),
        };
        assert_eq!(display_name(&profile, "sam@example.com"), "sam");
    }
}
