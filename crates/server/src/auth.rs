use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use marquee_core::error::ApiError;
use marquee_core::types::FederatedProvider;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

const TOKEN_TTL_HOURS: i64 = 24;

/// JWT claims payload.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // account ID
    pub email: String,
    pub email_verified: bool,
    pub exp: usize,
}

/// Issue a session token for an account.
pub fn issue_token(
    account_id: &str,
    email: &str,
    email_verified: bool,
    secret: &str,
) -> Result<String, AppError> {
    let exp = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| ApiError::Internal("time overflow".into()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: account_id.to_string(),
        email: email.to_string(),
        email_verified,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")).into())
}

/// Validate a session token and return claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| ApiError::Unauthorized(format!("invalid token: {e}")))?;

    Ok(data.claims)
}

/// Identity asserted by a federated provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FederatedClaims {
    pub iss: String,
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

/// Validate a provider assertion. The issuer must name the provider the
/// client claims to be signing in with.
pub fn validate_federated_assertion(
    assertion: &str,
    provider: FederatedProvider,
    secret: &str,
) -> Result<FederatedClaims, ApiError> {
    let mut validation = Validation::default();
    validation.set_issuer(&[provider.as_str()]);

    let data = decode::<FederatedClaims>(
        assertion,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| ApiError::Unauthorized(format!("invalid {provider} assertion: {e}")))?;

    Ok(data.claims)
}

/// Authenticated caller, pulled from the `Authorization: Bearer` header.
/// Email verification is not required.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: String,
    pub email: String,
    pub email_verified: bool,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("invalid authorization scheme".into()))?;

        let claims = validate_token(token, &state.jwt_secret)?;

        Ok(AuthUser {
            account_id: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
        })
    }
}

/// Caller with a verified email address.
#[derive(Debug, Clone)]
pub struct VerifiedUser {
    pub account_id: String,
    pub email: String,
}

impl FromRequestParts<AppState> for VerifiedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.email_verified {
            return Err(ApiError::Forbidden("email address not verified".into()).into());
        }
        Ok(VerifiedUser {
            account_id: user.account_id,
            email: user.email,
        })
    }
}

/// Verified caller whose profile carries the administrator flag.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub account_id: String,
    pub email: String,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = VerifiedUser::from_request_parts(parts, state).await?;

        let is_admin = marquee_db::repo::profiles::get_profile(&state.db, &user.account_id)
            .await?
            .is_some_and(|p| p.is_admin);

        if !is_admin {
            return Err(ApiError::Forbidden("admin access required".into()).into());
        }
        Ok(AdminUser {
            account_id: user.account_id,
            email: user.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assertion(iss: &str, secret: &str) -> String {
        let claims = FederatedClaims {
            iss: iss.into(),
            sub: "g-123".into(),
            email: "grace@example.com".into(),
            name: Some("Grace".into()),
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn token_round_trip_keeps_verification_flag() {
        let token = issue_token("acc-1", "ada@example.com", false, "s3cret").unwrap();
        let claims = validate_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, "acc-1");
        assert!(!claims.email_verified);
        assert!(validate_token(&token, "other").is_err());
    }

    #[test]
    fn federated_assertion_must_match_provider() {
        let token = assertion("google", "fed");
        let claims =
            validate_federated_assertion(&token, FederatedProvider::Google, "fed").unwrap();
        assert_eq!(claims.email, "grace@example.com");

        assert!(validate_federated_assertion(&token, FederatedProvider::Github, "fed").is_err());
        assert!(validate_federated_assertion(&token, FederatedProvider::Google, "nope").is_err());
    }
}
