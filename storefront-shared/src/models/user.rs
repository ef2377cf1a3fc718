/// User model
///
/// Users are created on local sign-up or on their first Google sign-in, and
/// mutated on profile updates, role promotion and every sign-in.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('user', 'admin');
/// CREATE TYPE auth_provider AS ENUM ('local', 'google');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255),
///     provider auth_provider NOT NULL DEFAULT 'local',
///     provider_id VARCHAR(255),
///     phone VARCHAR(20),
///     address VARCHAR(255),
///     role user_role NOT NULL DEFAULT 'user',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_sign_in_at TIMESTAMPTZ
/// );
///
/// CREATE UNIQUE INDEX users_email_key ON users (LOWER(email));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Access role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer
    User,

    /// Store administrator
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Identity provider a user signed in with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "auth_provider", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Email + password
    Local,

    /// Google OAuth2
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::Google => "google",
        }
    }
}

/// User row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    pub name: String,

    pub email: String,

    /// Argon2id hash; `None` for accounts created through OAuth
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    pub provider: Provider,

    /// Subject identifier at the OAuth provider
    pub provider_id: Option<String>,

    pub phone: Option<String>,

    pub address: Option<String>,

    pub role: Role,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Last successful sign-in, local or OAuth
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// Input for inserting a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub provider: Provider,
    pub provider_id: Option<String>,
}

/// Profile fields a user may change about themselves
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 100, message = "name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 20, message = "phone must be at most 20 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 255, message = "address must be at most 255 characters"))]
    pub address: Option<String>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.address.is_none()
    }
}

/// Public view of a user, returned by the profile endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub provider: Provider,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            provider: user.provider,
            phone: user.phone,
            address: user.address,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password_hash: Some("$argon2id$secret".to_string()),
            provider: Provider::Local,
            provider_id: None,
            phone: None,
            address: None,
            role: Role::User,
            created_at: now,
            updated_at: now,
            last_sign_in_at: None,
        }
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["provider"], "local");
    }

    #[test]
    fn test_update_profile_empty() {
        assert!(UpdateProfile::default().is_empty());

        let update = UpdateProfile {
            phone: Some("555-0100".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_update_profile_validation() {
        let update = UpdateProfile {
            name: Some("x".repeat(101)),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = UpdateProfile {
            name: Some("Jane Doe".to_string()),
            address: Some("1 Main Street".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_profile_from_user() {
        let user = sample_user();
        let id = user.id;
        let profile = UserProfile::from(user);
        assert_eq!(profile.id, id);
        assert_eq!(profile.email, "jane@example.com");
        assert!(!profile.role.is_admin());
    }
}
