use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Header the automation platform sends its shared secret in, and the relay
/// sends on outbound automation calls.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Bearer token claims for operator sessions.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id the token resolves to.
    pub sub: String,
    pub exp: usize,
}

/// Verifies inbound callback secrets and operator bearer tokens.
pub struct AuthService {
    webhook_secret: String,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(webhook_secret: &str, jwt_secret: &str) -> Self {
        Self {
            webhook_secret: webhook_secret.to_string(),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Check the shared-secret header on an automation callback.
    pub fn verify_webhook_secret(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let presented = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingSecret)?;

        if presented != self.webhook_secret {
            return Err(AuthError::BadSecret);
        }

        Ok(())
    }

    /// Resolve an operator bearer token to a user id.
    pub fn resolve_bearer_user(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let header = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingToken)?;

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(AuthError::InvalidToken)?;

        Ok(data.claims.sub)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing webhook secret header")]
    MissingSecret,

    #[error("Webhook secret mismatch")]
    BadSecret,

    #[error("Missing or malformed bearer token")]
    MissingToken,

    #[error("Invalid bearer token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn service() -> AuthService {
        AuthService::new("hook-secret", "jwt-secret")
    }

    fn mint_token(user_id: &str, secret: &str) -> String {
        let claims = SessionClaims {
            sub: user_id.to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_webhook_secret_match() {
        let mut headers = HeaderMap::new();
        headers.insert(WEBHOOK_SECRET_HEADER, HeaderValue::from_static("hook-secret"));
        assert!(service().verify_webhook_secret(&headers).is_ok());
    }

    #[test]
    fn test_webhook_secret_mismatch() {
        let mut headers = HeaderMap::new();
        headers.insert(WEBHOOK_SECRET_HEADER, HeaderValue::from_static("wrong"));
        assert!(matches!(
            service().verify_webhook_secret(&headers),
            Err(AuthError::BadSecret)
        ));
    }

    #[test]
    fn test_webhook_secret_missing() {
        assert!(matches!(
            service().verify_webhook_secret(&HeaderMap::new()),
            Err(AuthError::MissingSecret)
        ));
    }

    #[test]
    fn test_bearer_token_resolves_user() {
        let token = mint_token("user-42", "jwt-secret");
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(service().resolve_bearer_user(&headers).unwrap(), "user-42");
    }

    #[test]
    fn test_bearer_token_wrong_key_rejected() {
        let token = mint_token("user-42", "other-key");
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert!(matches!(
            service().resolve_bearer_user(&headers),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
