//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("malformed or unsigned token: {0}")]
    Decode(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a raw bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// HMAC-SHA256 validator with a shared secret.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time windows are carried as RFC3339 claims and checked by `validate_claims`.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| JwtError::Decode(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PrincipalId, Role};
    use chrono::Duration;
    use essentials_core::OrganizationId;
    use jsonwebtoken::{EncodingKey, Header};

    fn mint(secret: &str, ttl: Duration) -> (JwtClaims, String) {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: PrincipalId::new(),
            organization_id: OrganizationId::new(),
            roles: vec![Role::ORG_ADMIN],
            issued_at: now - Duration::seconds(1),
            expires_at: now + ttl,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        (claims, token)
    }

    #[test]
    fn accepts_token_signed_with_same_secret() {
        let (claims, token) = mint("s3cret", Duration::minutes(5));
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        assert_eq!(v.validate(&token, Utc::now()).unwrap(), claims);
    }

    #[test]
    fn rejects_wrong_secret() {
        let (_, token) = mint("s3cret", Duration::minutes(5));
        let v = Hs256JwtValidator::new(b"other".to_vec());
        assert!(matches!(v.validate(&token, Utc::now()), Err(JwtError::Decode(_))));
    }

    #[test]
    fn rejects_expired_claims() {
        let (_, token) = mint("s3cret", Duration::minutes(5));
        let v = Hs256JwtValidator::new(b"s3cret".to_vec());
        let later = Utc::now() + Duration::minutes(10);
        assert_eq!(
            v.validate(&token, later),
            Err(JwtError::Claims(TokenValidationError::Expired))
        );
    }
}
