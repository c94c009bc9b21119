use thiserror::Error;

use crate::jwt::JwtError;

const BEARER_SCHEME: &str = "Bearer";

/// Why a protected request was turned away.
///
/// Each variant is one exit of the verification sequence
/// extract → parse → signature → expiry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("Missing bearer credential")]
    MissingCredential,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,
}

impl From<JwtError> for TokenRejection {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidSignature => TokenRejection::InvalidSignature,
            JwtError::Expired => TokenRejection::Expired,
            other => TokenRejection::MalformedToken(other.to_string()),
        }
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// The scheme is matched case-insensitively. An absent header, another
/// scheme, or an empty token all count as no credential at all.
pub fn extract_bearer_token(authorization: Option<&str>) -> Result<&str, TokenRejection> {
    let value = authorization
        .map(str::trim)
        .ok_or(TokenRejection::MissingCredential)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(TokenRejection::MissingCredential)?;

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(TokenRejection::MissingCredential);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(TokenRejection::MissingCredential);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer_token(Some("bearer abc")), Ok("abc"));
        assert_eq!(extract_bearer_token(Some("  Bearer   abc  ")), Ok("abc"));
    }

    #[test]
    fn test_missing_or_unrecognized_header() {
        for header in [
            None,
            Some(""),
            Some("Bearer"),
            Some("Bearer    "),
            Some("Basic dXNlcjpwYXNz"),
            Some("abc.def.ghi"),
        ] {
            assert_eq!(
                extract_bearer_token(header),
                Err(TokenRejection::MissingCredential),
                "header {:?}",
                header
            );
        }
    }

    #[test]
    fn test_jwt_error_mapping() {
        assert_eq!(
            TokenRejection::from(JwtError::InvalidSignature),
            TokenRejection::InvalidSignature
        );
        assert_eq!(TokenRejection::from(JwtError::Expired), TokenRejection::Expired);
        assert!(matches!(
            TokenRejection::from(JwtError::Malformed("bad".to_string())),
            TokenRejection::MalformedToken(_)
        ));
    }
}
