use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::bearer::extract_bearer_token;
use crate::bearer::TokenRejection;
use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Lifetime of an issued bearer token unless configured otherwise.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Authentication coordinator combining password verification and JWT handling.
///
/// Built once at startup and shared read-only between requests.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    jwt_handler: JwtHandler,
    token_ttl: Duration,
}

/// A freshly minted bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for JWT signing
    /// * `token_ttl` - Lifetime of every issued token
    ///
    /// # Errors
    /// * `EmptySecret` - the secret is empty
    /// * `InvalidTtl` - the lifetime is zero or negative
    pub fn new(jwt_secret: &[u8], token_ttl: Duration) -> Result<Self, JwtError> {
        if token_ttl <= Duration::zero() {
            return Err(JwtError::InvalidTtl(token_ttl.num_seconds()));
        }

        Ok(Self {
            password_hasher: PasswordHasher::new(),
            jwt_handler: JwtHandler::new(jwt_secret)?,
            token_ttl,
        })
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Hash a password for storage.
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Check a password against a stored hash without issuing anything.
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        self.password_hasher.verify(password, stored_hash)
    }

    /// Verify credentials and generate a token for `subject`.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `PasswordError` - Stored hash is unusable
    /// * `JwtError` - Token generation failed
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        subject: impl ToString,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthenticationError> {
        if !self.verify_password(password, stored_hash)? {
            return Err(AuthenticationError::InvalidCredentials);
        }

        Ok(self.issue_token(subject, now)?)
    }

    /// Mint a token for an already verified identity.
    pub fn issue_token(
        &self,
        subject: impl ToString,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, JwtError> {
        let claims = Claims::for_subject(subject, now, self.token_ttl);
        let access_token = self.jwt_handler.encode(&claims)?;
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| JwtError::EncodingFailed(format!("exp {} out of range", claims.exp)))?;

        Ok(IssuedToken {
            access_token,
            expires_at,
        })
    }

    /// Validate a bare token at `now`.
    pub fn verify_token(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenRejection> {
        self.jwt_handler
            .decode(token, now.timestamp())
            .map_err(TokenRejection::from)
    }

    /// Validate the raw `Authorization` header of a request at `now`.
    pub fn verify_bearer(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenRejection> {
        let token = extract_bearer_token(authorization)?;
        self.verify_token(token, now)
    }
}
