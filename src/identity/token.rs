//! Self-contained signed bearer tokens (JWT, HS256).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::types::Role;

use super::error::IdentityError;
use super::secret::Secret;

const TOKEN_TTL_HOURS: i64 = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(username: &str, role: Role, secret: &Secret, now: DateTime<Utc>) -> Result<String, IdentityError> {
    let claims = Claims {
        sub: username.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.bytes()),
    )
    .map_err(|e| IdentityError::Token(e.to_string()))
}

pub fn verify_token(token: &str, secret: &Secret) -> Result<Claims, IdentityError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.bytes()),
        &Validation::default(),
    )
    .map_err(|e| IdentityError::Token(e.to_string()))?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> Secret {
        let dir = tempfile::tempdir().unwrap();
        Secret::load_or_generate(dir.path()).unwrap()
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let secret = secret();
        let now = Utc::now();
        let token = issue_token("alice", Role::Operator, &secret, now).unwrap();
        let claims = verify_token(&token, &secret).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, Role::Operator);
    }

    #[test]
    fn token_signed_with_different_secret_is_rejected() {
        let now = Utc::now();
        let token = issue_token("alice", Role::Operator, &secret(), now).unwrap();
        assert!(verify_token(&token, &secret()).is_err());
    }
}
