use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::config::config_loader;

#[derive(Debug, Serialize, Deserialize)]
pub struct BillingClaims {
    pub sub: String,
    pub exp: usize,
}

/// The portal account acting on this request, taken from the signed token
/// the web frontend issues after login.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: i64,
}

pub fn validate_billing_jwt(token: &str) -> Result<BillingClaims, anyhow::Error> {
    let secret = config_loader::get_auth_secret()?;

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(jsonwebtoken::Algorithm::HS256);

    let token_data = decode::<BillingClaims>(token, &decoding_key, &validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

    Ok(token_data.claims)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let auth_str = auth_header.to_str().map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header".to_string(),
            )
        })?;

        if !auth_str.starts_with("Bearer ") {
            return Err((
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header format".to_string(),
            ));
        }

        let token = &auth_str[7..];

        let claims = validate_billing_jwt(token)
            .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

        let account_id = claims.sub.parse::<i64>().map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                "Invalid account ID in token".to_string(),
            )
        })?;

        Ok(AuthUser { account_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::env;

    fn set_env_vars() {
        unsafe {
            env::set_var("BILLING_JWT_SECRET", "supersecretjwtsecretforunittesting123");
        }
    }

    fn make_token(secret: &str, sub: &str, exp: usize) -> String {
        let claims = BillingClaims {
            sub: sub.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_validate_billing_jwt_success() {
        set_env_vars();
        let token = make_token("supersecretjwtsecretforunittesting123", "42", 9999999999);

        let claims = validate_billing_jwt(&token).expect("Valid token should pass");
        assert_eq!(claims.sub, "42");
    }

    #[test]
    fn test_validate_billing_jwt_expired() {
        set_env_vars();
        let token = make_token("supersecretjwtsecretforunittesting123", "42", 1);

        assert!(validate_billing_jwt(&token).is_err());
    }

    #[test]
    fn test_validate_billing_jwt_invalid_signature() {
        set_env_vars();
        let token = make_token("wrongsecret", "42", 9999999999);

        assert!(validate_billing_jwt(&token).is_err());
    }
}
