use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use petfinder_types::api::Claims;
use petfinder_types::models::Role;

use crate::error::ApiError;

/// Issues and validates the self-contained session tokens. The signing
/// secret is injected once at startup; nothing here reads the environment.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
}

impl TokenService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign a token carrying `{sub, role}` that expires one hour from now.
    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user_id,
            role,
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to sign token: {}", e)))?;

        Ok(token)
    }

    /// Rejects on bad signature, malformed token, unknown role, or elapsed
    /// expiry — a tampered or expired token is never partially trusted.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| ApiError::InvalidToken)?;

        Ok(data.claims)
    }

    /// Validate, then reissue with the same claims and a fresh expiry.
    pub fn refresh(&self, token: &str) -> Result<String, ApiError> {
        let claims = self.validate(token)?;
        self.issue(claims.sub, claims.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret")
    }

    #[test]
    fn issue_validate_round_trip() {
        let svc = service();
        let user_id = Uuid::new_v4();

        let token = svc.issue(user_id, Role::Admin).unwrap();
        let claims = svc.validate(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > chrono::Utc::now().timestamp() as usize);
    }

    #[test]
    fn tampered_token_rejected() {
        let svc = service();
        let token = svc.issue(Uuid::new_v4(), Role::User).unwrap();

        let other = TokenService::new("other-secret");
        assert!(matches!(other.validate(&token), Err(ApiError::InvalidToken)));

        assert!(matches!(svc.validate("not.a.token"), Err(ApiError::InvalidToken)));
        assert!(matches!(svc.validate(""), Err(ApiError::InvalidToken)));
    }

    #[test]
    fn expired_token_rejected() {
        let svc = service();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::User,
            // well past the default validation leeway
            exp: (chrono::Utc::now() - chrono::Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(svc.validate(&token), Err(ApiError::InvalidToken)));
    }

    #[test]
    fn refresh_preserves_claims() {
        let svc = service();
        let user_id = Uuid::new_v4();

        let token = svc.issue(user_id, Role::User).unwrap();
        let refreshed = svc.refresh(&token).unwrap();

        let claims = svc.validate(&refreshed).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn refresh_fails_like_validate_on_bad_input() {
        let svc = service();
        assert!(matches!(svc.refresh("garbage"), Err(ApiError::InvalidToken)));
    }
}
