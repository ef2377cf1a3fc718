/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and length checks
/// - [`jwt`]: access / refresh token issuing and validation
/// - [`oauth`]: identity provider port with Google and mock implementations
///
/// # Example
///
/// ```no_run
/// use chrono::Duration;
/// use storefront_shared::auth::jwt::TokenIssuer;
/// use storefront_shared::auth::password::{hash_password, verify_password};
/// use storefront_shared::models::{Provider, Role};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let issuer = TokenIssuer::new("secret-key", Duration::minutes(15), Duration::days(7));
/// let pair = issuer.issue_pair(Uuid::new_v4(), Role::User, Provider::Local)?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod oauth;
pub mod password;
