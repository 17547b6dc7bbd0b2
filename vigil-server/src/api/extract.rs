//! Bearer-token extractors
//!
//! Handlers declare the principal they serve by taking one of these as an
//! argument; rejection happens before any handler logic runs.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::{Claims, Role};
use crate::error::ApiError;
use crate::AppState;

/// Authenticated elder principal
#[derive(Debug, Clone)]
pub struct ElderAuth {
    pub elder_guid: String,
}

/// Authenticated caregiver principal
#[derive(Debug, Clone)]
pub struct CaregiverAuth {
    pub caregiver_guid: String,
}

/// Authenticated principal of either role
#[derive(Debug, Clone)]
pub struct AnyAuth {
    pub guid: String,
    pub role: Role,
}

/// Optional elder credential: None when no Authorization header is present,
/// 401 when one is present but does not verify
#[derive(Debug, Clone)]
pub struct MaybeElderAuth(pub Option<String>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn require_claims(parts: &Parts, state: &AppState, role: Role) -> Result<Claims, ApiError> {
    let token = bearer_token(parts)
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
    state
        .auth
        .verify(token, role)
        .ok_or_else(|| ApiError::Unauthorized("invalid or expired token".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for ElderAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let claims = require_claims(parts, state, Role::Elder)?;
        Ok(ElderAuth { elder_guid: claims.sub })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CaregiverAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let claims = require_claims(parts, state, Role::Caregiver)?;
        Ok(CaregiverAuth { caregiver_guid: claims.sub })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AnyAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        let claims = state
            .auth
            .verify_any(token)
            .ok_or_else(|| ApiError::Unauthorized("invalid or expired token".to_string()))?;
        Ok(AnyAuth { guid: claims.sub, role: claims.role })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeElderAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        match bearer_token(parts) {
            None => Ok(MaybeElderAuth(None)),
            Some(token) => {
                let claims = state
                    .auth
                    .verify(token, Role::Elder)
                    .ok_or_else(|| ApiError::Unauthorized("invalid or expired token".to_string()))?;
                Ok(MaybeElderAuth(Some(claims.sub)))
            }
        }
    }
}
