use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
#[cfg(test)]
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Session token claims issued by the identity provider. `sub` is the
/// provider's user key, stored on our side as `users.external_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

/// Signs claims the same way the identity provider does.
#[cfg(test)]
pub(crate) fn create_jwt(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
pub(crate) fn test_token(sub: &str, secret: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    create_jwt(&claims, secret).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_token_signed_with_same_secret() {
        let token = test_token("user_123", "secret");
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, "user_123");
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = test_token("user_123", "secret");
        assert!(verify_jwt(&token, "another-secret").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let claims = Claims {
            sub: "user_123".to_string(),
            exp: (chrono::Utc::now() - chrono::Duration::hours(2)).timestamp() as usize,
        };
        let token = create_jwt(&claims, "secret").unwrap();
        assert!(verify_jwt(&token, "secret").is_err());
    }
}
