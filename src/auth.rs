use crate::{
    errors::AppError,
    models::{ADMIN_AUDIENCE, AdminClaims, CUSTOMER_AUDIENCE, CustomerClaims},
    state::AppState,
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Authenticated tenant administrator.
/// Add `auth: AuthTenant` as a parameter in any admin handler.
#[derive(Debug, Clone)]
pub struct AuthTenant {
    pub id: Uuid,
    pub name: String,
}

/// Authenticated subscriber of the customer API.
#[derive(Debug, Clone)]
pub struct AuthCustomer {
    pub id: Uuid,
    pub tenant_id: Uuid,
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".to_string()))
}

fn decode_claims<T: DeserializeOwned>(
    token: &str,
    secret: &str,
    audience: &str,
) -> Result<T, AppError> {
    let mut validation = Validation::default();
    validation.set_audience(&[audience]);

    decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

impl FromRequestParts<AppState> for AuthTenant {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims: AdminClaims = decode_claims(token, &state.config.jwt_secret, ADMIN_AUDIENCE)?;

        let tenant_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        Ok(AuthTenant {
            id: tenant_id,
            name: claims.tenant_name,
        })
    }
}

impl FromRequestParts<AppState> for AuthCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        verify_customer_token(token, &state.config.jwt_secret)
    }
}

pub fn verify_customer_token(token: &str, secret: &str) -> Result<AuthCustomer, AppError> {
    let claims: CustomerClaims = decode_claims(token, secret, CUSTOMER_AUDIENCE)?;

    Ok(AuthCustomer {
        id: Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?,
        tenant_id: Uuid::parse_str(&claims.tenant_id).map_err(|_| AppError::InvalidToken)?,
    })
}

pub fn generate_token(
    tenant_id: Uuid,
    tenant_name: &str,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = AdminClaims {
        sub: tenant_id.to_string(),
        tenant_name: tenant_name.to_string(),
        aud: ADMIN_AUDIENCE.to_string(),
        exp: (now + Duration::hours(expiry_hours)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn generate_customer_token(
    customer_id: Uuid,
    tenant_id: Uuid,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = CustomerClaims {
        sub: customer_id.to_string(),
        tenant_id: tenant_id.to_string(),
        aud: CUSTOMER_AUDIENCE.to_string(),
        exp: (now + Duration::hours(expiry_hours)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn customer_token_round_trips_identity() {
        let customer = Uuid::new_v4();
        let tenant = Uuid::new_v4();
        let token = generate_customer_token(customer, tenant, SECRET, 1).unwrap();

        let auth = verify_customer_token(&token, SECRET).unwrap();
        assert_eq!(auth.id, customer);
        assert_eq!(auth.tenant_id, tenant);
    }

    #[test]
    fn expired_customer_token_is_rejected() {
        let token = generate_customer_token(Uuid::new_v4(), Uuid::new_v4(), SECRET, -2).unwrap();
        assert!(matches!(
            verify_customer_token(&token, SECRET),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = generate_customer_token(Uuid::new_v4(), Uuid::new_v4(), "other", 1).unwrap();
        assert!(verify_customer_token(&token, SECRET).is_err());
    }

    #[test]
    fn admin_token_is_not_a_customer_token() {
        let token = generate_token(Uuid::new_v4(), "Acme ISP", SECRET, 1).unwrap();
        assert!(verify_customer_token(&token, SECRET).is_err());
    }

    #[test]
    fn unsigned_base64_payload_is_rejected() {
        // {"id":"...","exp":...} with no signature at all
        let forged = "eyJpZCI6IjEiLCJleHAiOjk5OTk5OTk5OTl9";
        assert!(verify_customer_token(forged, SECRET).is_err());
    }
}
