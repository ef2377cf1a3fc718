/// Session and OAuth state entries on top of [`KeyValueCache`]
///
/// # Keys
///
/// - `refresh_token:{user_id}`: JSON [`RefreshTokenEntry`], TTL = refresh token TTL
/// - `oauth_state:{state}`: `"valid"`, TTL 10 minutes, cut to 1 minute once a
///   callback has presented it

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{CacheResult, KeyValueCache};
use crate::models::Provider;

/// Value stored under an OAuth state key
pub const OAUTH_STATE_VALUE: &str = "valid";

/// Lifetime of a freshly issued OAuth state
pub const OAUTH_STATE_TTL: Duration = Duration::from_secs(600);

/// Lifetime of an OAuth state after a callback presented it
pub const OAUTH_STATE_CONSUMED_TTL: Duration = Duration::from_secs(60);

/// Length of generated OAuth state strings
pub const OAUTH_STATE_LEN: usize = 32;

pub fn refresh_token_key(user_id: Uuid) -> String {
    format!("refresh_token:{}", user_id)
}

pub fn oauth_state_key(state: &str) -> String {
    format!("oauth_state:{}", state)
}

/// Random alphanumeric OAuth state
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(OAUTH_STATE_LEN)
        .map(char::from)
        .collect()
}

/// SHA-256 hex digest, used to keep local refresh tokens out of the cache in clear
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Server-side record of a session
///
/// For Google sessions `token` is the Google refresh token; for local
/// sessions it is the SHA-256 hash of the refresh JWT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenEntry {
    pub provider: Provider,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Typed access to session entries
#[derive(Clone)]
pub struct SessionCache {
    cache: Arc<dyn KeyValueCache>,
}

impl SessionCache {
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self { cache }
    }

    pub async fn store_refresh_token(
        &self,
        user_id: Uuid,
        entry: &RefreshTokenEntry,
        ttl: Duration,
    ) -> CacheResult<()> {
        let json = serde_json::to_string(entry)?;
        self.cache
            .set_ex(&refresh_token_key(user_id), &json, ttl)
            .await
    }

    pub async fn refresh_token(&self, user_id: Uuid) -> CacheResult<Option<RefreshTokenEntry>> {
        let json = self.cache.get(&refresh_token_key(user_id)).await?;
        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }

    /// Google refresh token cached for `user_id`
    ///
    /// Local entries hold a hash, not a Google token, so they count as absent
    /// along with empty tokens.
    pub async fn google_refresh_token(&self, user_id: Uuid) -> CacheResult<Option<String>> {
        Ok(self
            .refresh_token(user_id)
            .await?
            .filter(|entry| entry.provider == Provider::Google)
            .map(|entry| entry.token)
            .filter(|token| !token.is_empty()))
    }

    pub async fn delete_refresh_token(&self, user_id: Uuid) -> CacheResult<bool> {
        self.cache.del(&refresh_token_key(user_id)).await
    }

    pub async fn store_oauth_state(&self, state: &str) -> CacheResult<()> {
        self.cache
            .set_ex(&oauth_state_key(state), OAUTH_STATE_VALUE, OAUTH_STATE_TTL)
            .await
    }

    /// Returns true when `state` is live; its TTL is then cut to one minute
    pub async fn consume_oauth_state(&self, state: &str) -> CacheResult<bool> {
        if state.is_empty() {
            return Ok(false);
        }

        let key = oauth_state_key(state);
        match self.cache.get(&key).await? {
            Some(value) if value == OAUTH_STATE_VALUE => {
                self.cache.expire(&key, OAUTH_STATE_CONSUMED_TTL).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
