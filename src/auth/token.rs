// JWT verification for bearer tokens issued by the account service

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::{error::AuthError, models::Role};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32, // user_id
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Token service for JWT operations
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_token_duration: i64, // in seconds
}

impl TokenService {
    /// Create a TokenService; issued tokens live for 15 minutes
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_duration: 900,
        }
    }

    /// Issue an access token for a user
    pub fn issue(&self, user_id: i32, email: &str, role: Role) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now,
            exp: now + self.access_token_duration,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Validate a token and return its claims
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_token_service() -> TokenService {
        TokenService::new("test_secret_key_for_testing_purposes")
    }

    #[test]
    fn test_token_expires_in_15_minutes() {
        let service = test_token_service();
        let token = service.issue(1, "test@example.com", Role::User).unwrap();
        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_claims_carry_role() {
        let service = test_token_service();
        let token = service.issue(7, "admin@tokri.in", Role::Admin).unwrap();
        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "admin@tokri.in");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = test_token_service().issue(1, "a@b.c", Role::User).unwrap();
        let other = TokenService::new("a_completely_different_secret");
        assert!(matches!(other.validate(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = test_token_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            email: "old@example.com".to_string(),
            role: Role::User,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test_secret_key_for_testing_purposes".as_bytes()),
        )
        .unwrap();

        assert!(matches!(service.validate(&token), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            test_token_service().validate("not.a.jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    proptest! {
        #[test]
        fn prop_claims_round_trip_user_id(user_id in 1i32..1_000_000) {
            let service = test_token_service();
            let token = service.issue(user_id, "p@example.com", Role::User).unwrap();
            let claims = service.validate(&token).unwrap();
            prop_assert_eq!(claims.sub, user_id);
        }
    }
}
