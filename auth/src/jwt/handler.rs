use std::collections::HashSet;

use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::errors::JwtError;

/// HS256 signer and verifier for bearer tokens.
///
/// Expiry is checked against a caller-supplied clock instead of the system
/// clock, so issuance and verification are deterministic under test.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHandler {
    /// Create a handler from a symmetric secret.
    ///
    /// # Errors
    /// * `EmptySecret` - the secret has no bytes
    pub fn new(secret: &[u8]) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::EmptySecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Sign claims into a compact JWT.
    ///
    /// # Errors
    /// * `EncodingFailed` - serialization or signing failed
    pub fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Decode a token, checking structure, then signature, then expiry.
    ///
    /// # Arguments
    /// * `token` - compact JWT
    /// * `current_timestamp` - Unix seconds used for the expiry check
    ///
    /// # Errors
    /// * `Malformed` - not a JWT, wrong algorithm, or claims missing/undecodable
    /// * `InvalidSignature` - signature does not match this handler's secret
    /// * `Expired` - `exp <= current_timestamp`
    pub fn decode(&self, token: &str, current_timestamp: i64) -> Result<Claims, JwtError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                    ErrorKind::ExpiredSignature => JwtError::Expired,
                    _ => JwtError::Malformed(e.to_string()),
                }
            })?;

        if token_data.claims.is_expired(current_timestamp) {
            return Err(JwtError::Expired);
        }

        Ok(token_data.claims)
    }
}
