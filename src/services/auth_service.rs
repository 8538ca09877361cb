//! Registration, login, and bearer-token issuing/verification.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::{Role, User};
use crate::interfaces::{StorageError, UserStore};

/// Token lifetime: 24 hours.
const TOKEN_TTL_SECS: i64 = 86_400;

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during authentication.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserExists,

    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("invalid token")]
    InvalidToken,

    #[error("password hashing failed")]
    Hashing,

    #[error("token signing failed: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),

    #[error("storage error: {0}")]
    Store(StorageError),
}

/// Bearer-token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub exp: i64,
}

/// Registration and login backed by the user store; tokens are HS256 JWTs
/// signed with the configured secret.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt_secret: &str) -> Self {
        Self {
            users,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl: Duration::seconds(TOKEN_TTL_SECS),
        }
    }

    /// Token lifetime in seconds, as reported in login responses.
    pub fn token_ttl_secs(&self) -> i64 {
        self.token_ttl.num_seconds()
    }

    /// Create a new user account with an argon2-hashed password.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
        role: Role,
        client_id: Option<String>,
    ) -> Result<User> {
        if username.is_empty() {
            return Err(AuthError::InvalidInput("username is required"));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password is required"));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidInput("a valid email is required"));
        }

        let password_hash = hash_password(password)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role,
            client_id,
            created_at: now,
            updated_at: now,
        };

        self.users.create(&user).await.map_err(|e| match e {
            StorageError::UserExists => AuthError::UserExists,
            other => AuthError::Store(other),
        })?;

        info!(username = %user.username, role = %user.role, "user registered");
        Ok(user)
    }

    /// Verify credentials and issue a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User)> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self.users.find_by_email(email).await.map_err(|e| match e {
            StorageError::UserNotFound => AuthError::UserNotFound,
            other => AuthError::Store(other),
        })?;

        verify_password(password, &user.password_hash)?;

        let token = self.sign(&user)?;
        Ok((token, user))
    }

    /// Validate a bearer token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AuthError::InvalidToken)?;
        Ok(data.claims)
    }

    fn sign(&self, user: &User) -> Result<String> {
        let claims = Claims {
            username: user.username.clone(),
            role: user.role,
            client_id: user.client_id.clone(),
            exp: (Utc::now() + self.token_ttl).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AuthError::Hashing)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::Hashing)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}
