//! Authentication core for the identity service.
//!
//! - Password hashing (Argon2id)
//! - Bearer token issuance and verification (JWT, HS256)
//! - `Authorization` header extraction with a typed rejection reason
//!
//! The crate never touches storage: callers hand it a stored hash and get back
//! either a token or a reason the request must be refused.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).unwrap());
//! assert!(!hasher.verify("not_my_password", &hash).unwrap());
//! ```
//!
//! ## Login and protected request
//! ```
//! use auth::{Authenticator, TokenRejection, DEFAULT_TOKEN_TTL_HOURS};
//! use chrono::{Duration, Utc};
//!
//! let auth = Authenticator::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
//! )
//! .unwrap();
//!
//! // Register: hash password
//! let hash = auth.hash_password("password123").unwrap();
//!
//! // Login: verify and mint token
//! let now = Utc::now();
//! let issued = auth.authenticate("password123", &hash, "user123", now).unwrap();
//!
//! // Protected request: verify the header
//! let header = format!("Bearer {}", issued.access_token);
//! let claims = auth.verify_bearer(Some(&header), now).unwrap();
//! assert_eq!(claims.sub, "user123");
//!
//! // A day later the same token is refused
//! let later = now + Duration::hours(DEFAULT_TOKEN_TTL_HOURS);
//! assert_eq!(auth.verify_bearer(Some(&header), later), Err(TokenRejection::Expired));
//! ```

pub mod authenticator;
pub mod bearer;
pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use authenticator::IssuedToken;
pub use authenticator::DEFAULT_TOKEN_TTL_HOURS;
pub use bearer::extract_bearer_token;
pub use bearer::TokenRejection;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
