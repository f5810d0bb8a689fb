//! Bearer-token verification. Tokens are issued elsewhere; this side only
//! checks the HS256 signature and expiry and hands the core a [`Claim`].

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::model::Claim;

use super::{ApiError, AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User identifier.
    pub sub: String,
    pub role: String,
    pub exp: i64,
}

pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claim, ApiError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::Unauthenticated("token expired".into()),
                _ => ApiError::Unauthenticated("invalid token".into()),
            }
        })?;
        Ok(Claim {
            user_id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

fn bearer(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Some)
        .ok_or_else(|| ApiError::Unauthenticated("invalid authorization header".into()))
}

fn verified(parts: &mut Parts, state: &AppState, token: &str) -> Result<Claim, ApiError> {
    if let Some(claim) = parts.extensions.get::<Claim>() {
        return Ok(claim.clone());
    }
    let claim = state.verifier.verify(token).inspect_err(|e| {
        tracing::warn!(uri = %parts.uri, error = %e, "bearer token rejected");
    })?;
    parts.extensions.insert(claim.clone());
    Ok(claim)
}

impl FromRequestParts<AppState> for Claim {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer(parts)?
            .ok_or_else(|| ApiError::Unauthenticated("authorization required".into()))?
            .to_string();
        verified(parts, state, &token)
    }
}

/// An absent header is anonymous; a present but bad one is still rejected.
impl OptionalFromRequestParts<AppState> for Claim {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match bearer(parts)?.map(str::to_string) {
            Some(token) => verified(parts, state, &token).map(Some),
            None => Ok(None),
        }
    }
}
