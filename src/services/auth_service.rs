//! Account management: salted password hashing and signed session tokens.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::dao::users::{UserRecord, UserStore, UserStoreError};
use crate::error::ServiceError;

/// Session tokens stay valid for a week.
const TOKEN_TTL: Duration = Duration::days(7);

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id the token was issued for.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Create an account, hashing the password with argon2id.
pub async fn signup(store: &UserStore, username: &str, password: &str) -> Result<(), ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| ServiceError::Internal(format!("password hashing failed: {err}")))?
        .to_string();

    match store.create(username, &password_hash).await {
        Ok(user) => {
            info!(username = %user.username, "account created");
            Ok(())
        }
        Err(UserStoreError::UsernameTaken) => {
            Err(ServiceError::Conflict("username already taken".into()))
        }
        Err(UserStoreError::Database(err)) => Err(err.into()),
    }
}

/// Verify credentials and issue a token bearing the user id.
pub async fn login(
    store: &UserStore,
    secret: &str,
    username: &str,
    password: &str,
) -> Result<(String, UserRecord), ServiceError> {
    let Some(user) = store.find_by_username(username).await? else {
        return Err(ServiceError::Unauthorized("invalid credentials".into()));
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| ServiceError::Internal("stored password hash is corrupt".into()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ServiceError::Unauthorized("invalid credentials".into()))?;

    let token = issue_token(secret, &user.id)?;
    Ok((token, user))
}

/// Resolve a bearer token to its account.
pub async fn identify(
    store: &UserStore,
    secret: &str,
    token: &str,
) -> Result<UserRecord, ServiceError> {
    let claims = verify_token(secret, token)?;
    store
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| ServiceError::NotFound("user not found".into()))
}

/// Sign a fresh token for `user_id`.
pub fn issue_token(secret: &str, user_id: &str) -> Result<String, ServiceError> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.unix_timestamp(),
        exp: (now + TOKEN_TTL).unix_timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| ServiceError::Internal(format!("token signing failed: {err}")))
}

/// Decode and validate a token, returning its claims.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ServiceError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ServiceError::Unauthorized("invalid token".into()))
}
