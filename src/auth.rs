// ABOUTME: JWT-based user authentication and authorization system
// ABOUTME: Handles token generation, validation, and bearer header extraction
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Authentication and Session Management
//!
//! HS256 JWT authentication for the VivuChat server. Tokens carry the user id
//! and username, expire after a configurable number of hours, and are
//! presented as `Authorization: Bearer <token>` headers.

use crate::constants::service_names;
use crate::errors::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `JWT` claims for user authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User `ID`
    pub sub: String,
    /// Username, carried for logging and display
    pub username: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Audience (who the token is intended for)
    pub aud: String,
}

/// Authentication result with user context
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// Authenticated user `ID`
    pub user_id: Uuid,
    /// Authenticated username
    pub username: String,
}

/// Authentication manager for `JWT` tokens
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

impl AuthManager {
    /// Create a new authentication manager from a shared secret
    #[must_use]
    pub fn new(jwt_secret: &[u8], token_expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret),
            decoding_key: DecodingKey::from_secret(jwt_secret),
            token_expiry_hours,
        }
    }

    /// Generate a `JWT` token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails
    pub fn generate_token(&self, user_id: Uuid, username: &str) -> AppResult<String> {
        let now = Utc::now();
        let expiry = now + Duration::hours(self.token_expiry_hours);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_owned(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
            aud: service_names::VIVUCHAT_SERVER.to_owned(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode JWT: {e}")))
    }

    /// Validate a `JWT` token and return its claims
    ///
    /// # Errors
    ///
    /// Returns an error if the token is expired, malformed, or carries an
    /// invalid signature
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_audience(&[service_names::VIVUCHAT_SERVER]);

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::new(
                        crate::errors::ErrorCode::AuthExpired,
                        "JWT token has expired",
                    ),
                    _ => AppError::auth_invalid(format!("JWT validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }

    /// Authenticate a request from its `Authorization` header value
    ///
    /// # Errors
    ///
    /// Returns an error if the header is missing, is not a bearer token, or
    /// the token fails validation
    pub fn authenticate_request(&self, auth_header: Option<&str>) -> AppResult<AuthResult> {
        let header = auth_header.ok_or_else(AppError::auth_required)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::auth_invalid("Authorization header must be a bearer token"))?;

        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::auth_invalid("Token subject is not a valid user id"))?;

        Ok(AuthResult {
            user_id,
            username: claims.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> AuthManager {
        AuthManager::new(b"test-secret-for-unit-tests", 24)
    }

    #[test]
    fn test_generate_and_validate_token() {
        let auth = manager();
        let user_id = Uuid::new_v4();

        let token = auth.generate_token(user_id, "alice").unwrap();
        let claims = auth.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_validate_rejects_wrong_secret() {
        let auth = manager();
        let other = AuthManager::new(b"a-different-secret", 24);

        let token = auth.generate_token(Uuid::new_v4(), "alice").unwrap();
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_authenticate_request_requires_bearer() {
        let auth = manager();

        assert!(auth.authenticate_request(None).is_err());
        assert!(auth.authenticate_request(Some("Basic abc123")).is_err());

        let token = auth.generate_token(Uuid::new_v4(), "bob").unwrap();
        let result = auth
            .authenticate_request(Some(&format!("Bearer {token}")))
            .unwrap();
        assert_eq!(result.username, "bob");
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = AuthManager::new(b"test-secret-for-unit-tests", -1);
        let token = auth.generate_token(Uuid::new_v4(), "carol").unwrap();

        let err = auth.validate_token(&token).unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::AuthExpired);
    }
}
